//! Persistent storage.
//!
//! An embedded `SQLite` store owns all persistent data: sources, files,
//! chunks (with their embeddings), the query cache, and the query history.
//! Access goes through the narrow [`Store`] trait so tests can construct
//! an in-memory database.

pub mod schema;
mod sqlite;
mod traits;

pub use sqlite::{SqliteStore, blob_to_vec, vec_to_blob};
pub use traits::{
    CacheEntry, CacheMeta, CacheStats, ChunkFilter, HistoryEntry, IndexStats, QueryRecord, Store,
};
