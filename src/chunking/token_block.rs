//! Token-block chunking.
//!
//! Walks the file line by line, accumulating lines until the accumulated
//! token count reaches the chunk size, then emits a chunk and seeds the
//! next one with the last `chunk_overlap` tokens' worth of whole lines
//! from the previous chunk. Lines are never split: a single line larger
//! than the chunk size becomes a chunk of exactly that line.

use crate::chunking::{ChunkOptions, split_lines};
use crate::core::{Chunk, ChunkKind};
use crate::token::Tokenizer;

/// Splits `content` into token-bounded line blocks.
///
/// The returned chunks tile the file: consecutive ranges touch or overlap,
/// so the union covers every line.
#[must_use]
pub fn token_block_chunks(
    tokenizer: &Tokenizer,
    source_id: &str,
    file_path: &str,
    content: &str,
    options: &ChunkOptions,
) -> Vec<Chunk> {
    let lines = split_lines(content);
    if lines.is_empty() {
        return Vec::new();
    }
    let counts: Vec<usize> = lines.iter().map(|line| tokenizer.count(line)).collect();

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut acc = 0usize;
    // Index of the last line already included in an emitted chunk.
    let mut emitted_through: Option<usize> = None;

    for i in 0..lines.len() {
        acc += counts[i];
        if acc >= options.chunk_size {
            chunks.push(make_chunk(
                tokenizer, source_id, file_path, &lines, start, i,
            ));
            emitted_through = Some(i);

            // Seed the next chunk with the maximal suffix of the emitted
            // block whose token sum fits the overlap budget. The suffix is
            // always a proper suffix because acc >= chunk_size > overlap.
            let mut next_start = i + 1;
            let mut overlap_acc = 0usize;
            while next_start > start {
                let candidate = next_start - 1;
                if overlap_acc + counts[candidate] > options.chunk_overlap {
                    break;
                }
                overlap_acc += counts[candidate];
                next_start = candidate;
            }
            start = next_start;
            acc = overlap_acc;
        }
    }

    let last = lines.len() - 1;
    if emitted_through != Some(last) {
        chunks.push(make_chunk(
            tokenizer, source_id, file_path, &lines, start, last,
        ));
    }

    chunks
}

fn make_chunk(
    tokenizer: &Tokenizer,
    source_id: &str,
    file_path: &str,
    lines: &[&str],
    start: usize,
    end: usize,
) -> Chunk {
    let content = lines[start..=end].join("\n");
    let tokens = tokenizer.count(&content);
    Chunk::new(
        source_id,
        file_path,
        content,
        start + 1,
        end + 1,
        tokens,
        ChunkKind::TokenBlock,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(chunk_size: usize, chunk_overlap: usize) -> ChunkOptions {
        ChunkOptions {
            chunk_size,
            chunk_overlap,
            use_ast: false,
        }
    }

    fn chunk(content: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
        token_block_chunks(
            &Tokenizer::new(),
            "s",
            "file.txt",
            content,
            &options(chunk_size, overlap),
        )
    }

    #[test]
    fn test_small_file_single_chunk() {
        let chunks = chunk("one line\nand another\n", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 2);
        assert_eq!(chunks[0].content, "one line\nand another");
    }

    #[test]
    fn test_splits_at_token_budget() {
        // Each line is ~2 tokens; budget 6 forces a split every 3 lines.
        let content = (0..9)
            .map(|i| format!("word{i} another"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk(&content, 6, 0);
        assert!(chunks.len() >= 3, "got {} chunks", chunks.len());
        assert_eq!(chunks[0].start_line, 1);
        // With zero overlap the ranges partition the file.
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start_line, pair[0].end_line + 1);
        }
        assert_eq!(chunks.last().unwrap().end_line, 9);
    }

    #[test]
    fn test_overlap_carries_lines() {
        let content = (0..10)
            .map(|i| format!("word{i} another"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk(&content, 6, 4);
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            // Overlapping: the next chunk starts at or before the line
            // after the previous end, never later.
            assert!(pair[1].start_line <= pair[0].end_line + 1);
            // And never restarts at the previous start.
            assert!(pair[1].start_line > pair[0].start_line);
        }
        // With a budget this generous, at least one pair shares a line.
        assert!(
            chunks
                .windows(2)
                .any(|pair| pair[1].start_line <= pair[0].end_line)
        );
    }

    #[test]
    fn test_oversized_line_is_its_own_chunk() {
        let long = "verylongword ".repeat(200);
        let content = format!("short one\n{long}\nshort two");
        let chunks = chunk(&content, 50, 10);
        let oversized: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| c.start_line == 2 && c.end_line == 2)
            .collect();
        assert_eq!(oversized.len(), 1, "oversized line emitted alone");
        assert_eq!(oversized[0].content, long);
    }

    #[test]
    fn test_no_trailing_overlap_only_chunk() {
        // File ends exactly on an emit boundary; the seeded overlap must
        // not become a trailing duplicate chunk.
        let content = "alpha beta gamma delta epsilon zeta";
        let chunks = chunk(content, 1, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_line, 1);
    }

    #[test]
    fn test_blank_lines_covered() {
        let content = "a\n\n\nb\n\nc";
        let chunks = chunk(content, 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 6);
        assert_eq!(chunks[0].content, content);
    }

    #[test]
    fn test_tokens_recounted_on_content() {
        let tokenizer = Tokenizer::new();
        let content = "let a = 1;\nlet b = 2;\nlet c = 3;";
        for chunk in chunk(content, 5, 1) {
            assert_eq!(chunk.tokens, tokenizer.count(&chunk.content));
        }
    }
}
