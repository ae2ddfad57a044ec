//! # ContextKit
//!
//! Local-first context selection for LLMs.
//!
//! ContextKit indexes one or more source roots and, for any
//! natural-language query, selects the minimal, most relevant,
//! token-bounded slice of code formatted for pasting into a model.
//!
//! ## Pipeline
//!
//! - **Index**: discover files, chunk them (token-block or syntax-aware),
//!   embed the chunks, and store everything in a single `SQLite` file —
//!   incrementally, keyed by content hash.
//! - **Select**: embed the query, retrieve candidates by vector
//!   similarity, rank with lexical and structural signals, fit to a token
//!   budget with adjacency merging, and render as markdown, XML, JSON or
//!   plain text. Results are cached per index generation.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod chunking;
pub mod cli;
pub mod config;
pub mod core;
pub mod discovery;
pub mod embedding;
pub mod error;
pub mod format;
pub mod imports;
pub mod index;
pub mod io;
pub mod project;
pub mod select;
pub mod storage;
pub mod symbols;
pub mod token;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{Chunk, ChunkKind, FileRecord, Source};

// Re-export storage types
pub use storage::{SqliteStore, Store};

// Re-export the pipeline entry points
pub use index::{CancelToken, IndexOptions, Indexer};
pub use select::{SelectMode, SelectOptions, Selection, select};

// Re-export embedding types
#[cfg(feature = "fastembed-embeddings")]
pub use embedding::FastEmbedEmbedder;
pub use embedding::{DEFAULT_DIMENSIONS, Embedder, HashEmbedder, cosine_similarity, create_embedder};

// Re-export formatting types
pub use format::OutputFormat;

// Re-export CLI types
pub use cli::{Cli, Commands, execute};

// Re-export project layout
pub use project::Project;

// Re-export the token counter
pub use token::Tokenizer;
