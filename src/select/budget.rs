//! Token-budget fitting and adjacency merging.
//!
//! Greedy knapsack approximation weighted toward score: walk the ranked
//! list, admit a chunk when its tokens fit the remaining budget, skip it
//! otherwise (never truncate) and keep going so a later, smaller chunk can
//! still get in. Afterwards, chunks from the same file whose line ranges
//! touch or overlap are coalesced, with tokens recounted.

use crate::core::Chunk;
use crate::select::ranker::RankedChunk;
use crate::token::Tokenizer;

/// Result of fitting ranked chunks into a budget.
#[derive(Debug, Default)]
pub struct FitOutcome {
    /// Selected (and merged) chunks, highest score first.
    pub chunks: Vec<RankedChunk>,
    /// Total tokens of the selection; never exceeds the budget.
    pub total_tokens: usize,
    /// Ranked chunks that did not fit.
    pub excluded_count: usize,
}

/// Fits `ranked` into `budget` tokens and merges per-file adjacent chunks.
#[must_use]
pub fn fit(ranked: Vec<RankedChunk>, budget: usize, tokenizer: &Tokenizer) -> FitOutcome {
    let mut remaining = budget;
    let mut included: Vec<RankedChunk> = Vec::new();
    let mut excluded_count = 0usize;

    for entry in ranked {
        if entry.chunk.tokens <= remaining {
            remaining -= entry.chunk.tokens;
            included.push(entry);
        } else {
            excluded_count += 1;
        }
    }

    let merged = merge_adjacent(included, tokenizer);
    let total_tokens = merged.iter().map(|r| r.chunk.tokens).sum();
    FitOutcome {
        chunks: merged,
        total_tokens,
        excluded_count,
    }
}

/// Coalesces same-file chunks whose ranges touch or overlap.
///
/// The merged chunk's content is the union of the underlying file lines,
/// its score is the max of the inputs, and its tokens are recounted.
/// Merging only removes duplicated overlap lines, so the fitted total can
/// shrink but never grow.
fn merge_adjacent(included: Vec<RankedChunk>, tokenizer: &Tokenizer) -> Vec<RankedChunk> {
    // Per-file sort by start line; files keyed by (source, path).
    let mut by_position = included;
    by_position.sort_by(|a, b| {
        (&a.chunk.source_id, &a.chunk.file_path, a.chunk.start_line).cmp(&(
            &b.chunk.source_id,
            &b.chunk.file_path,
            b.chunk.start_line,
        ))
    });

    let mut merged: Vec<RankedChunk> = Vec::with_capacity(by_position.len());
    for entry in by_position {
        match merged.last_mut() {
            Some(last)
                if last.chunk.source_id == entry.chunk.source_id
                    && last.chunk.is_adjacent_to(&entry.chunk) =>
            {
                merge_into(last, entry, tokenizer);
            }
            _ => merged.push(entry),
        }
    }

    // Back to ranked order for the formatter's first-appearance grouping.
    merged.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.signals.similarity.total_cmp(&a.signals.similarity))
            .then_with(|| a.chunk.file_path.cmp(&b.chunk.file_path))
            .then_with(|| a.chunk.start_line.cmp(&b.chunk.start_line))
    });
    merged
}

/// Merges `next` into `base`, both from the same file with
/// `next.start_line <= base.end_line + 1` and `base` starting first.
fn merge_into(base: &mut RankedChunk, next: RankedChunk, tokenizer: &Tokenizer) {
    let RankedChunk {
        chunk: next_chunk,
        signals: next_signals,
        score: next_score,
    } = next;

    if next_chunk.end_line > base.chunk.end_line {
        // Append the lines of `next` that lie beyond base's range. Both
        // contents are exact line substrings, so index math is enough.
        let skip = base.chunk.end_line + 1 - next_chunk.start_line;
        let mut content = std::mem::take(&mut base.chunk.content);
        for line in next_chunk.content.lines().skip(skip) {
            content.push('\n');
            content.push_str(line);
        }
        let tokens = tokenizer.count(&content);
        base.chunk = Chunk::new(
            &base.chunk.source_id,
            &base.chunk.file_path,
            content,
            base.chunk.start_line,
            next_chunk.end_line,
            tokens,
            base.chunk.kind,
        );
    }
    // Contained ranges change nothing but still contribute their score.
    if next_score > base.score {
        base.score = next_score;
        base.signals = next_signals;
    }
}
