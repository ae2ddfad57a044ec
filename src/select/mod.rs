//! Query-time selection: retrieve, rank, fit, format, cache.
//!
//! Within a single select, the final chunk order is a pure function of
//! the query, the options, and the index generation, so outputs are
//! reproducible. The rendered output is cached under a fingerprint that
//! includes the generation; any index write invalidates all entries
//! automatically.

mod budget;
mod ranker;
mod retriever;

pub use budget::{FitOutcome, fit};
pub use ranker::{RankedChunk, Signals, file_type_boost, query_tokens, rank};
pub use retriever::{Candidate, DEFAULT_CANDIDATE_LIMIT, retrieve};

use crate::embedding::Embedder;
use crate::error::Result;
use crate::format::{self, OutputFormat};
use crate::imports::ImportGraph;
use crate::storage::{CacheEntry, CacheMeta, ChunkFilter, QueryRecord, Store};
use crate::token::Tokenizer;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Instant;

/// Default token budget for a selection.
pub const DEFAULT_BUDGET: usize = 8_000;

/// Selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Rank over every chunk.
    #[default]
    Full,
    /// Rank only header/declaration chunks: a signature-level map of the
    /// tree.
    Map,
}

impl SelectMode {
    /// Stable string form, used in fingerprints and history rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Map => "map",
        }
    }

    /// Parses the string form.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidUsage`] for unknown modes.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Self::Full),
            "map" => Ok(Self::Map),
            other => Err(crate::Error::InvalidUsage {
                message: format!("unknown mode {other:?} (expected full or map)"),
            }),
        }
    }
}

/// Options for one select operation, with explicit defaults.
#[derive(Debug, Clone)]
pub struct SelectOptions {
    /// Token budget.
    pub budget: usize,
    /// Selection mode.
    pub mode: SelectMode,
    /// Output format.
    pub format: OutputFormat,
    /// Restrict retrieval to these source ids (empty = all).
    pub sources: Vec<String>,
    /// Append the scoring breakdown (markdown only).
    pub explain: bool,
    /// Build the import graph and apply the import boost.
    pub include_imports: bool,
    /// Consult and populate the query cache.
    pub use_cache: bool,
    /// Retriever candidate limit.
    pub candidate_limit: usize,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            mode: SelectMode::Full,
            format: OutputFormat::Markdown,
            sources: Vec::new(),
            explain: false,
            include_imports: false,
            use_cache: true,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }
}

/// The materialized result of a selection, handed to the formatter.
#[derive(Debug)]
pub struct Selection {
    /// The query as given.
    pub query: String,
    /// Final chunks: budget-fitted, merged, highest score first.
    pub chunks: Vec<RankedChunk>,
    /// Total tokens across `chunks`.
    pub total_tokens: usize,
    /// Candidates considered before fitting.
    pub chunks_considered: usize,
    /// Candidates dropped by the budget fitter.
    pub excluded_count: usize,
    /// Wall time of the selection in milliseconds.
    pub time_ms: u64,
}

impl Selection {
    /// Number of distinct files in the selection.
    #[must_use]
    pub fn files_included(&self) -> usize {
        let mut files: Vec<&str> = self
            .chunks
            .iter()
            .map(|r| r.chunk.file_path.as_str())
            .collect();
        files.sort_unstable();
        files.dedup();
        files.len()
    }
}

/// What a select run produced.
#[derive(Debug)]
pub struct SelectOutput {
    /// The rendered output in the requested format.
    pub rendered: String,
    /// Whether it came from the query cache.
    pub from_cache: bool,
    /// The materialized selection (absent on cache hits).
    pub selection: Option<Selection>,
}

/// Normalizes a query for fingerprinting: trimmed, lowercased, inner
/// whitespace collapsed.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Computes the cache fingerprint for a query under `options` at
/// `generation`.
#[must_use]
pub fn fingerprint(query: &str, options: &SelectOptions, generation: i64) -> String {
    let mut sorted_sources = options.sources.clone();
    sorted_sources.sort();
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    hasher.update([0]);
    hasher.update(options.budget.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(options.mode.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(options.format.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(sorted_sources.join(",").as_bytes());
    hasher.update([0]);
    hasher.update(generation.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Runs the full selection pipeline.
///
/// Retrieve → (map filter) → rank → fit → format, with a cache check in
/// front and a history record behind.
///
/// # Errors
///
/// Returns [`crate::Error::IndexEmpty`] when nothing is retrievable, or
/// any storage/embedding error from the pipeline stages.
pub fn select(
    store: &mut dyn Store,
    embedder: &dyn Embedder,
    tokenizer: &Tokenizer,
    query: &str,
    options: &SelectOptions,
) -> Result<SelectOutput> {
    let started = Instant::now();
    let generation = store.generation()?;
    let key = fingerprint(query, options, generation);

    if options.use_cache
        && let Some(entry) = store.cache_get(&key)?
    {
        record(store, query, options, entry.meta.chunk_count, entry.meta.total_tokens, &started)?;
        return Ok(SelectOutput {
            rendered: entry.output,
            from_cache: true,
            selection: None,
        });
    }

    let source_filter = if options.sources.is_empty() {
        None
    } else {
        Some(options.sources.as_slice())
    };
    let mut candidates = retrieve(
        store,
        embedder,
        query,
        source_filter,
        options.candidate_limit,
    )?;
    if options.mode == SelectMode::Map {
        candidates.retain(|c| c.chunk.kind.is_declaration());
    }
    let chunks_considered = candidates.len();

    let graph = if options.include_imports {
        Some(build_import_graph(store, source_filter)?)
    } else {
        None
    };
    let ranked = rank(candidates, query, graph.as_ref());
    let outcome = fit(ranked, options.budget, tokenizer);

    let selection = Selection {
        query: query.to_string(),
        chunks: outcome.chunks,
        total_tokens: outcome.total_tokens,
        chunks_considered,
        excluded_count: outcome.excluded_count,
        time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    let rendered = format::render(&selection, options.format, options.explain);

    record(
        store,
        query,
        options,
        selection.chunks.len(),
        selection.total_tokens,
        &started,
    )?;
    if options.use_cache {
        store.cache_put(&CacheEntry {
            fingerprint: key,
            output: rendered.clone(),
            meta: CacheMeta {
                query: query.to_string(),
                format: options.format.as_str().to_string(),
                total_tokens: selection.total_tokens,
                chunk_count: selection.chunks.len(),
            },
            created_at: now(),
            hits: 0,
        })?;
    }

    Ok(SelectOutput {
        rendered,
        from_cache: false,
        selection: Some(selection),
    })
}

/// Builds the in-memory import graph from the indexed chunk contents in
/// scope. Chunks of a file are stitched back together in line order.
fn build_import_graph(
    store: &dyn Store,
    sources: Option<&[String]>,
) -> Result<ImportGraph> {
    let mut filter = ChunkFilter::default();
    let chunks = match sources {
        Some([single]) => {
            filter.source_id = Some(single.clone());
            store.list_chunks(&filter)?
        }
        Some(many) => {
            let mut all = store.list_chunks(&filter)?;
            all.retain(|c| many.contains(&c.source_id));
            all
        }
        None => store.list_chunks(&filter)?,
    };

    let mut files: BTreeMap<String, String> = BTreeMap::new();
    for chunk in chunks {
        let entry = files.entry(chunk.file_path).or_default();
        if !entry.is_empty() {
            entry.push('\n');
        }
        entry.push_str(&chunk.content);
    }
    let pairs: Vec<(String, String)> = files.into_iter().collect();
    Ok(ImportGraph::build(&pairs))
}

fn record(
    store: &mut dyn Store,
    query: &str,
    options: &SelectOptions,
    chunk_count: usize,
    total_tokens: usize,
    started: &Instant,
) -> Result<()> {
    store.record_query(&QueryRecord {
        query: query.to_string(),
        budget: options.budget,
        mode: options.mode.as_str().to_string(),
        format: options.format.as_str().to_string(),
        sources: options.sources.clone(),
        chunk_count,
        total_tokens,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        created_at: now(),
    })?;
    Ok(())
}

fn now() -> i64 {
    #[allow(clippy::cast_possible_wrap)]
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
