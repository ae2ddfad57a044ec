//! Incremental indexing.
//!
//! The indexer orchestrates discovery, chunking, embedding and storage:
//! it diffs the current tree against the stored content hashes, replaces
//! only what changed (one transaction per file), and fills embeddings in
//! deferred, order-preserving batches. Re-running on an unchanged tree
//! writes nothing and never invokes the embedder.

mod indexer;

pub use indexer::{IndexOptions, Indexer, SourceOutcome, embed_with_retry};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default embedding batch size.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 16;

/// Default retry attempts for a failed embedding batch.
pub const DEFAULT_EMBED_RETRIES: u32 = 3;

/// Default number of embedding batches in flight.
pub const DEFAULT_EMBED_CONCURRENCY: usize = 4;

/// The three change sets of an incremental index run, plus the files that
/// need no work. The sets are pairwise disjoint and
/// `added ∪ modified ∪ unchanged` equals the current tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDiff {
    /// In the current tree but not the prior index.
    pub added: Vec<String>,
    /// In both, with a different content hash.
    pub modified: Vec<String>,
    /// In the prior index but gone from the tree.
    pub removed: Vec<String>,
    /// In both with the same hash.
    pub unchanged: Vec<String>,
}

impl IndexDiff {
    /// Whether any re-chunking or deletion is needed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Computes the change sets between the current tree and the prior
/// `path -> hash` map. Outputs are sorted by path.
#[must_use]
pub fn diff_files(
    current: &BTreeMap<String, String>,
    prior: &BTreeMap<String, String>,
) -> IndexDiff {
    let mut diff = IndexDiff::default();
    for (path, hash) in current {
        match prior.get(path) {
            None => diff.added.push(path.clone()),
            Some(old) if old == hash => diff.unchanged.push(path.clone()),
            Some(_) => diff.modified.push(path.clone()),
        }
    }
    for path in prior.keys() {
        if !current.contains_key(path) {
            diff.removed.push(path.clone());
        }
    }
    diff
}

/// Pipeline stage reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStage {
    /// Walking the source root.
    Discover,
    /// Chunking and storing changed files.
    Chunk,
    /// Filling embeddings.
    Embed,
    /// Final bookkeeping.
    Commit,
}

impl IndexStage {
    /// Human-readable stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Commit => "commit",
        }
    }
}

/// Progress report handed to the index callback.
#[derive(Debug, Clone)]
pub struct IndexProgress {
    /// Current stage.
    pub stage: IndexStage,
    /// Source being indexed.
    pub source_id: String,
    /// Number of files with work in this run.
    pub files_total: usize,
    /// Files finished so far.
    pub files_done: usize,
}

/// Cooperative cancellation flag, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
