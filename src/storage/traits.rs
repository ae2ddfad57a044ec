//! Store trait definition.
//!
//! The store exclusively owns all persistent data. Writers serialize via
//! exclusive transactions per file replacement; readers observe a
//! consistent snapshot. An index generation counter is bumped by every
//! write that can change retrieval results and participates in all cache
//! keys, so re-indexing invalidates the query cache automatically.

use crate::core::{Chunk, Source};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Filters for [`Store::list_chunks`].
#[derive(Debug, Clone, Default)]
pub struct ChunkFilter {
    /// Restrict to one source.
    pub source_id: Option<String>,
    /// Restrict to one file within the source.
    pub file_path: Option<String>,
}

/// Aggregate index statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    /// Number of registered sources.
    pub source_count: usize,
    /// Number of indexed files.
    pub file_count: usize,
    /// Number of stored chunks.
    pub chunk_count: usize,
    /// Chunks that carry an embedding.
    pub embedded_count: usize,
    /// Sum of chunk token counts.
    pub total_tokens: usize,
    /// Database file size in bytes (None for in-memory).
    pub db_size: Option<u64>,
}

/// Metadata stored alongside a cached selection output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    /// The original (un-normalized) query.
    pub query: String,
    /// Output format the entry was rendered in.
    pub format: String,
    /// Total tokens in the cached selection.
    pub total_tokens: usize,
    /// Number of chunks in the cached selection.
    pub chunk_count: usize,
}

/// A query-cache row.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cache key: fingerprint of query, options and index generation.
    pub fingerprint: String,
    /// The full rendered selection output.
    pub output: String,
    /// Selection metadata.
    pub meta: CacheMeta,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// How many times this entry has been served.
    pub hits: i64,
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of cached entries.
    pub entries: usize,
    /// Sum of hit counters.
    pub total_hits: i64,
}

/// An executed query, appended to the history log.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRecord {
    /// The query string as given.
    pub query: String,
    /// Token budget used.
    pub budget: usize,
    /// Selection mode (`full` or `map`).
    pub mode: String,
    /// Output format name.
    pub format: String,
    /// Source filter, empty when unfiltered.
    pub sources: Vec<String>,
    /// Chunks included in the selection.
    pub chunk_count: usize,
    /// Total tokens in the selection.
    pub total_tokens: usize,
    /// Wall time of the select, in milliseconds.
    pub duration_ms: u64,
    /// Unix timestamp of execution.
    pub created_at: i64,
}

/// A history row: a [`QueryRecord`] with its assigned id.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// Row id, usable with `history --run <id>`.
    pub id: i64,
    /// The recorded query.
    #[serde(flatten)]
    pub record: QueryRecord,
}

/// Persistent storage interface.
///
/// All operations are snapshot-consistent reads or transactional writes.
pub trait Store: Send {
    /// Creates the schema; idempotent.
    fn init(&mut self) -> Result<()>;

    /// Whether the schema exists.
    fn is_initialized(&self) -> Result<bool>;

    /// Current index generation (monotonically increasing).
    fn generation(&self) -> Result<i64>;

    /// Token-counter fingerprint recorded at init, if any.
    fn token_model(&self) -> Result<Option<String>>;

    /// Records the token-counter fingerprint.
    fn set_token_model(&mut self, fingerprint: &str) -> Result<()>;

    // ==================== Sources ====================

    /// Creates or updates a source row. Bumps the generation.
    fn upsert_source(&mut self, source: &Source) -> Result<()>;

    /// Fetches one source by id.
    fn get_source(&self, id: &str) -> Result<Option<Source>>;

    /// Lists all sources, ordered by id.
    fn list_sources(&self) -> Result<Vec<Source>>;

    /// Removes a source and everything under it. Bumps the generation.
    fn remove_source(&mut self, id: &str) -> Result<()>;

    /// Updates a source's `indexed_at` without bumping the generation
    /// (an unchanged re-index must keep cache entries valid).
    fn touch_source(&mut self, id: &str, indexed_at: i64) -> Result<()>;

    // ==================== Files & chunks ====================

    /// The prior `relative_path -> content_hash` map for a source.
    fn file_hashes(&self, source_id: &str) -> Result<BTreeMap<String, String>>;

    /// Replaces a file's chunks in one exclusive transaction: deletes old
    /// chunks, inserts the new ones, upserts the file row, bumps the
    /// generation.
    fn replace_file_chunks(
        &mut self,
        source_id: &str,
        relative_path: &str,
        content_hash: &str,
        chunks: &[Chunk],
    ) -> Result<()>;

    /// Fills the embedding column for a batch of chunks. Vectors must
    /// already be L2-normalized. Bumps the generation.
    fn set_embeddings(&mut self, updates: &[(String, Vec<f32>)], model: &str) -> Result<()>;

    /// Deletes a file row and its chunks. Bumps the generation.
    fn delete_file(&mut self, source_id: &str, relative_path: &str) -> Result<()>;

    /// Lists chunks matching the filter, ordered by
    /// `(source_id, file_path, start_line)`.
    fn list_chunks(&self, filter: &ChunkFilter) -> Result<Vec<Chunk>>;

    /// All chunks that carry an embedding, optionally restricted to a set
    /// of sources, in deterministic order.
    fn chunks_with_embeddings(&self, sources: Option<&[String]>) -> Result<Vec<Chunk>>;

    /// Aggregate statistics.
    fn index_stats(&self) -> Result<IndexStats>;

    // ==================== Query cache ====================

    /// Looks up a cache entry, bumping its hit counter on success.
    fn cache_get(&mut self, fingerprint: &str) -> Result<Option<CacheEntry>>;

    /// Inserts or replaces a cache entry.
    fn cache_put(&mut self, entry: &CacheEntry) -> Result<()>;

    /// Drops all cache entries.
    fn cache_clear(&mut self) -> Result<()>;

    /// Cache statistics.
    fn cache_stats(&self) -> Result<CacheStats>;

    // ==================== Query history ====================

    /// Appends a history row, returning its id.
    fn record_query(&mut self, record: &QueryRecord) -> Result<i64>;

    /// The most recent history rows, newest first.
    fn get_history(&self, limit: usize) -> Result<Vec<HistoryEntry>>;

    /// One history row by id.
    fn get_history_entry(&self, id: i64) -> Result<Option<HistoryEntry>>;

    /// Clears the history log.
    fn clear_history(&mut self) -> Result<()>;
}
