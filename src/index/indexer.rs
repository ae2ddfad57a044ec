//! The indexer: discovery, diff, chunk, embed, store.

use crate::chunking::{ChunkOptions, chunk_file};
use crate::core::Source;
use crate::discovery::{DiscoveryOptions, discover};
use crate::embedding::{Embedder, l2_normalize};
use crate::error::{Error, Result};
use crate::index::{
    CancelToken, DEFAULT_EMBED_BATCH_SIZE, DEFAULT_EMBED_CONCURRENCY, DEFAULT_EMBED_RETRIES,
    IndexProgress, IndexStage, diff_files,
};
use crate::storage::Store;
use crate::token::Tokenizer;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Indexing options with explicit defaults.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Chunking configuration.
    pub chunk: ChunkOptions,
    /// Discovery configuration.
    pub discovery: DiscoveryOptions,
    /// Texts per embedding call.
    pub embed_batch_size: usize,
    /// Retry attempts per failed batch.
    pub embed_retries: u32,
    /// Embedding batches in flight at once.
    pub embed_concurrency: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            chunk: ChunkOptions::default(),
            discovery: DiscoveryOptions::default(),
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            embed_retries: DEFAULT_EMBED_RETRIES,
            embed_concurrency: DEFAULT_EMBED_CONCURRENCY,
        }
    }
}

/// Result of indexing one source.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SourceOutcome {
    /// The source that was indexed.
    pub source_id: String,
    /// Files newly indexed.
    pub added: usize,
    /// Files re-indexed because their hash changed.
    pub modified: usize,
    /// Files removed from the index.
    pub removed: usize,
    /// Files left untouched.
    pub unchanged: usize,
    /// Files discovery reported but did not yield.
    pub skipped: usize,
    /// Chunks written in this run.
    pub chunks_written: usize,
    /// Chunks that received an embedding.
    pub chunks_embedded: usize,
    /// Chunks left without an embedding after retries ran out.
    pub embed_failures: usize,
    /// True when the run stopped at a cancellation point.
    pub cancelled: bool,
}

/// Orchestrates the index pipeline against a store and an embedder.
pub struct Indexer<'a> {
    store: &'a mut dyn Store,
    embedder: &'a dyn Embedder,
    tokenizer: &'a Tokenizer,
    options: IndexOptions,
}

impl<'a> Indexer<'a> {
    /// Creates an indexer borrowing its collaborators.
    pub fn new(
        store: &'a mut dyn Store,
        embedder: &'a dyn Embedder,
        tokenizer: &'a Tokenizer,
        options: IndexOptions,
    ) -> Self {
        Self {
            store,
            embedder,
            tokenizer,
            options,
        }
    }

    /// Indexes every given source in order.
    ///
    /// # Errors
    ///
    /// Fails fast on the first source error; completed sources stay
    /// committed.
    pub fn index_all(
        &mut self,
        sources: &[Source],
        cancel: &CancelToken,
        mut progress: impl FnMut(&IndexProgress),
    ) -> Result<Vec<SourceOutcome>> {
        let mut outcomes = Vec::with_capacity(sources.len());
        for source in sources {
            let outcome = self.index_source(source, cancel, &mut progress)?;
            let stop = outcome.cancelled;
            outcomes.push(outcome);
            if stop {
                break;
            }
        }
        Ok(outcomes)
    }

    /// Indexes one source incrementally.
    ///
    /// Each changed file is replaced in its own exclusive transaction, so
    /// cancellation between files leaves the store consistent. Embeddings
    /// are filled after the chunk pass, in batches, in order.
    ///
    /// # Errors
    ///
    /// Returns discovery or storage errors; embedding failures are not
    /// fatal (the affected chunks stay un-embedded and are excluded from
    /// similarity search until a later re-index).
    pub fn index_source(
        &mut self,
        source: &Source,
        cancel: &CancelToken,
        mut progress: impl FnMut(&IndexProgress),
    ) -> Result<SourceOutcome> {
        let mut outcome = SourceOutcome {
            source_id: source.id.clone(),
            ..SourceOutcome::default()
        };

        progress(&IndexProgress {
            stage: IndexStage::Discover,
            source_id: source.id.clone(),
            files_total: 0,
            files_done: 0,
        });
        let report = discover(source, &self.options.discovery)?;
        outcome.skipped = report.skipped.len();

        let current: BTreeMap<String, String> = report
            .files
            .iter()
            .map(|f| (f.relative_path.clone(), f.content_hash.clone()))
            .collect();
        let prior = self.store.file_hashes(&source.id)?;
        let diff = diff_files(&current, &prior);
        outcome.added = diff.added.len();
        outcome.modified = diff.modified.len();
        outcome.removed = diff.removed.len();
        outcome.unchanged = diff.unchanged.len();

        let files_total = diff.added.len() + diff.modified.len();
        let mut files_done = 0usize;
        // (chunk id, content) pairs awaiting an embedding.
        let mut pending: Vec<(String, String)> = Vec::new();

        for file in &report.files {
            let changed = diff.added.binary_search(&file.relative_path).is_ok()
                || diff.modified.binary_search(&file.relative_path).is_ok();
            if !changed {
                continue;
            }
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                return Ok(outcome);
            }

            let chunks = chunk_file(
                self.tokenizer,
                &source.id,
                &file.relative_path,
                &file.content,
                &self.options.chunk,
            )?;
            self.store.replace_file_chunks(
                &source.id,
                &file.relative_path,
                &file.content_hash,
                &chunks,
            )?;
            outcome.chunks_written += chunks.len();
            pending.extend(chunks.into_iter().map(|c| (c.id, c.content)));

            files_done += 1;
            progress(&IndexProgress {
                stage: IndexStage::Chunk,
                source_id: source.id.clone(),
                files_total,
                files_done,
            });
        }

        for path in &diff.removed {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                return Ok(outcome);
            }
            self.store.delete_file(&source.id, path)?;
            debug!(source = %source.id, path = %path, "removed deleted file");
        }

        if !pending.is_empty() {
            progress(&IndexProgress {
                stage: IndexStage::Embed,
                source_id: source.id.clone(),
                files_total,
                files_done,
            });
            self.embed_pending(&mut outcome, pending)?;
        }

        self.store.touch_source(&source.id, now())?;
        progress(&IndexProgress {
            stage: IndexStage::Commit,
            source_id: source.id.clone(),
            files_total,
            files_done,
        });
        Ok(outcome)
    }

    /// Embeds pending chunks in bounded-parallel, order-preserving batches.
    fn embed_pending(
        &mut self,
        outcome: &mut SourceOutcome,
        pending: Vec<(String, String)>,
    ) -> Result<()> {
        let batch_size = self.options.embed_batch_size.max(1);
        let retries = self.options.embed_retries;
        let batches: Vec<&[(String, String)]> = pending.chunks(batch_size).collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.embed_concurrency.max(1))
            .build()
            .map_err(|e| Error::Embedding {
                message: format!("embedding pool: {e}"),
                retriable: false,
            })?;

        let embedder = self.embedder;
        // Collecting keeps batch order stable regardless of completion
        // order, so rows are written deterministically.
        let results: Vec<Result<Vec<Vec<f32>>>> = pool.install(|| {
            batches
                .par_iter()
                .map(|batch| {
                    let texts: Vec<&str> = batch.iter().map(|(_, c)| c.as_str()).collect();
                    embed_with_retry(embedder, &texts, retries)
                })
                .collect()
        });

        let expected_dims = self.embedder.dimensions();
        for (batch, result) in batches.iter().zip(results) {
            match result {
                Ok(vectors) => {
                    if vectors.len() != batch.len()
                        || vectors.iter().any(|v| v.len() != expected_dims)
                    {
                        warn!(
                            batch = batch.len(),
                            "embedder returned a malformed batch; chunks left without embedding"
                        );
                        outcome.embed_failures += batch.len();
                        continue;
                    }
                    let updates: Vec<(String, Vec<f32>)> = batch
                        .iter()
                        .zip(vectors)
                        .map(|((id, _), mut vector)| {
                            l2_normalize(&mut vector);
                            (id.clone(), vector)
                        })
                        .collect();
                    self.store
                        .set_embeddings(&updates, self.embedder.fingerprint())?;
                    outcome.chunks_embedded += updates.len();
                }
                Err(e) => {
                    warn!(error = %e, "embedding batch failed after retries");
                    outcome.embed_failures += batch.len();
                }
            }
        }
        Ok(())
    }
}

/// Calls the embedder, retrying retriable failures with exponential
/// backoff (100ms, 200ms, 400ms, ...) up to `retries` extra attempts.
///
/// # Errors
///
/// Returns the last error once the retry cap is reached, or immediately
/// for non-retriable failures.
pub fn embed_with_retry(
    embedder: &dyn Embedder,
    texts: &[&str],
    retries: u32,
) -> Result<Vec<Vec<f32>>> {
    let mut attempt = 0u32;
    loop {
        match embedder.embed(texts) {
            Ok(vectors) => return Ok(vectors),
            Err(error) => {
                let retriable = matches!(error, Error::Embedding { retriable: true, .. });
                if !retriable || attempt >= retries {
                    return Err(error);
                }
                let delay = Duration::from_millis(100u64.saturating_mul(1 << attempt));
                warn!(attempt = attempt + 1, ?delay, error = %error, "embed retry");
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

fn now() -> i64 {
    #[allow(clippy::cast_possible_wrap)]
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
