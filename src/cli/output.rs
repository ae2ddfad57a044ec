//! Output rendering for CLI commands.
//!
//! Each report type renders as human text or, with `--json`, as a machine
//! object. Selection output is handled by the formatter; this module
//! covers the management commands.

use crate::config::SourceConfig;
use crate::index::SourceOutcome;
use crate::storage::{CacheStats, HistoryEntry, IndexStats};
use crate::symbols::Symbol;
use serde::Serialize;
use std::fmt::Write;

/// Report for the `status` command.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Whether `.contextkit/` exists.
    pub initialized: bool,
    /// Registered source count.
    pub sources: usize,
    /// Index generation counter.
    pub generation: i64,
    /// Aggregate index statistics.
    pub stats: IndexStats,
}

/// Report for the `diff` command, one per source.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    /// The source diffed.
    pub source: String,
    /// Files not yet indexed.
    pub added: Vec<String>,
    /// Files whose hash changed, with their prior chunk count.
    pub modified: Vec<ModifiedFile>,
    /// Indexed files gone from disk.
    pub removed: Vec<String>,
    /// Files left untouched.
    pub unchanged: usize,
}

/// One modified file in a [`DiffReport`].
#[derive(Debug, Serialize)]
pub struct ModifiedFile {
    /// Path relative to the source root.
    pub path: String,
    /// Chunks currently stored for the file.
    pub prior_chunks: usize,
}

/// One symbol search hit.
#[derive(Debug, Serialize)]
pub struct SymbolHit {
    /// File the symbol lives in.
    pub file: String,
    /// The symbol.
    #[serde(flatten)]
    pub symbol: Symbol,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Renders the `status` report.
#[must_use]
pub fn format_status(report: &StatusReport, json: bool) -> String {
    if json {
        return to_json(report);
    }
    let mut out = String::new();
    out.push_str("ContextKit Status\n");
    out.push_str("=================\n\n");
    let _ = writeln!(
        out,
        "  Initialized:  {}",
        if report.initialized { "yes" } else { "no" }
    );
    let _ = writeln!(out, "  Sources:      {}", report.sources);
    let _ = writeln!(out, "  Files:        {}", report.stats.file_count);
    let _ = writeln!(
        out,
        "  Chunks:       {} ({} embedded)",
        report.stats.chunk_count, report.stats.embedded_count
    );
    let _ = writeln!(out, "  Tokens:       {}", report.stats.total_tokens);
    let _ = writeln!(out, "  Generation:   {}", report.generation);
    if let Some(size) = report.stats.db_size {
        let _ = writeln!(out, "  DB size:      {size} bytes");
    }
    out
}

/// Renders the registered source list.
#[must_use]
pub fn format_sources(sources: &[SourceConfig], json: bool) -> String {
    if json {
        return to_json(&sources);
    }
    if sources.is_empty() {
        return "No sources registered.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} {:<40} Globs", "Name", "Path");
    out.push_str(&"-".repeat(70));
    out.push('\n');
    for source in sources {
        let globs = match (source.include.is_empty(), source.exclude.is_empty()) {
            (true, true) => "-".to_string(),
            (false, true) => format!("+{}", source.include.join(",")),
            (true, false) => format!("-{}", source.exclude.join(",")),
            (false, false) => format!(
                "+{} -{}",
                source.include.join(","),
                source.exclude.join(",")
            ),
        };
        let _ = writeln!(
            out,
            "{:<16} {:<40} {}",
            source.name,
            source.path.display(),
            globs
        );
    }
    out
}

/// Renders index run outcomes.
#[must_use]
pub fn format_outcomes(outcomes: &[SourceOutcome], json: bool) -> String {
    if json {
        return to_json(&outcomes);
    }
    let mut out = String::new();
    for outcome in outcomes {
        let _ = writeln!(
            out,
            "{}: +{} ~{} -{} ({} unchanged, {} skipped), {} chunks, {} embedded{}{}",
            outcome.source_id,
            outcome.added,
            outcome.modified,
            outcome.removed,
            outcome.unchanged,
            outcome.skipped,
            outcome.chunks_written,
            outcome.chunks_embedded,
            if outcome.embed_failures > 0 {
                format!(", {} embed failures", outcome.embed_failures)
            } else {
                String::new()
            },
            if outcome.cancelled { " [cancelled]" } else { "" },
        );
    }
    out
}

/// Renders a diff report set.
#[must_use]
pub fn format_diffs(reports: &[DiffReport], json: bool) -> String {
    if json {
        return to_json(&reports);
    }
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(out, "{}:", report.source);
        for path in &report.added {
            let _ = writeln!(out, "  added     {path}");
        }
        for file in &report.modified {
            let _ = writeln!(
                out,
                "  modified  {} ({} chunks)",
                file.path, file.prior_chunks
            );
        }
        for path in &report.removed {
            let _ = writeln!(out, "  removed   {path}");
        }
        if report.added.is_empty() && report.modified.is_empty() && report.removed.is_empty() {
            let _ = writeln!(out, "  up to date ({} files)", report.unchanged);
        }
    }
    out
}

/// Renders symbol search results.
#[must_use]
pub fn format_symbols(hits: &[SymbolHit], json: bool) -> String {
    if json {
        return to_json(&hits);
    }
    if hits.is_empty() {
        return "No symbols found.\n".to_string();
    }
    let mut out = String::new();
    for hit in hits {
        let _ = writeln!(
            out,
            "{}:{}  {}  {}",
            hit.file,
            hit.symbol.start_line,
            hit.symbol.kind.as_str(),
            hit.symbol.signature
        );
    }
    out
}

/// Renders the history listing.
#[must_use]
pub fn format_history(entries: &[HistoryEntry], json: bool) -> String {
    if json {
        return to_json(&entries);
    }
    if entries.is_empty() {
        return "No queries recorded.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<40} {:<8} {:<8} Tokens",
        "ID", "Query", "Mode", "Chunks"
    );
    out.push_str(&"-".repeat(78));
    out.push('\n');
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<6} {:<40} {:<8} {:<8} {}",
            entry.id,
            truncate(&entry.record.query, 40),
            entry.record.mode,
            entry.record.chunk_count,
            entry.record.total_tokens
        );
    }
    out
}

/// Renders cache statistics.
#[must_use]
pub fn format_cache_stats(stats: &CacheStats, json: bool) -> String {
    if json {
        return to_json(stats);
    }
    format!(
        "Cache: {} entries, {} total hits\n",
        stats.entries, stats.total_hits
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
