//! Chunking: splitting files into retrieval units.
//!
//! Two modes, selected by configuration:
//!
//! - **Token-block** (`use_ast = false`): accumulate whole lines up to a
//!   token budget, with a token-budgeted line overlap between consecutive
//!   chunks.
//! - **Syntax-aware** (`use_ast = true`): one chunk per top-level
//!   declaration, recognized by per-language line patterns, with the file
//!   preamble emitted as a `header` chunk. Falls back to token-block for
//!   unsupported extensions or files where no declaration is found.
//!
//! Every emitted chunk covers an exact, 1-indexed inclusive line range of
//! the file, and for a non-empty file the union of ranges covers every
//! line at least once.

mod syntax;
mod token_block;

pub use syntax::syntax_chunks;
pub use token_block::token_block_chunks;

use crate::core::Chunk;
use crate::error::{Error, Result};
use crate::token::Tokenizer;

/// Default chunk size in tokens.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default overlap between consecutive token-block chunks, in tokens.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// A header chunk is only emitted on its own above this many tokens;
/// shorter preambles are folded into the first declaration chunk.
pub const HEADER_MIN_TOKENS: usize = 20;

/// Chunking options with explicit defaults.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Target chunk size in tokens.
    pub chunk_size: usize,
    /// Overlap between consecutive token-block chunks, in tokens.
    pub chunk_overlap: usize,
    /// Whether to attempt syntax-aware chunking before token blocks.
    pub use_ast: bool,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            use_ast: true,
        }
    }
}

impl ChunkOptions {
    /// Validates the option record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUsage`] when `chunk_size` is zero or the
    /// overlap is not smaller than the chunk size.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidUsage {
                message: "chunk_size must be > 0".to_string(),
            });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidUsage {
                message: format!(
                    "chunk_overlap {} must be less than chunk_size {}",
                    self.chunk_overlap, self.chunk_size
                ),
            });
        }
        Ok(())
    }
}

/// Chunks one file according to `options`.
///
/// Syntax-aware mode is attempted for supported extensions and falls back
/// to token-block chunking when the file yields no declarations. An empty
/// file yields no chunks.
///
/// # Errors
///
/// Returns [`Error::InvalidUsage`] for an invalid option record.
pub fn chunk_file(
    tokenizer: &Tokenizer,
    source_id: &str,
    file_path: &str,
    content: &str,
    options: &ChunkOptions,
) -> Result<Vec<Chunk>> {
    options.validate()?;

    if content.is_empty() {
        return Ok(Vec::new());
    }

    if options.use_ast
        && let Some(chunks) = syntax_chunks(tokenizer, source_id, file_path, content)
    {
        return Ok(chunks);
    }

    Ok(token_block_chunks(
        tokenizer, source_id, file_path, content, options,
    ))
}

/// Splits content into lines the way chunk ranges count them: `\n`
/// terminated, final trailing newline not producing an empty last line.
#[must_use]
pub(crate) fn split_lines(content: &str) -> Vec<&str> {
    content.lines().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChunkKind;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new()
    }

    /// Asserts the six chunk invariants against the original content.
    pub(crate) fn assert_chunk_invariants(chunks: &[Chunk], content: &str) {
        let lines = split_lines(content);
        let mut covered = vec![false; lines.len()];
        for chunk in chunks {
            assert!(chunk.start_line >= 1);
            assert!(chunk.start_line <= chunk.end_line);
            assert!(chunk.end_line <= lines.len());
            let expected = lines[chunk.start_line - 1..chunk.end_line].join("\n");
            assert_eq!(chunk.content, expected, "content fidelity");
            assert_eq!(chunk.tokens, Tokenizer::new().count(&chunk.content));
            assert!(chunk.id.starts_with("chunk_"));
            for line in chunk.start_line..=chunk.end_line {
                covered[line - 1] = true;
            }
        }
        assert!(covered.iter().all(|&c| c), "coverage");
    }

    #[test]
    fn test_empty_file_no_chunks() {
        let chunks =
            chunk_file(&tokenizer(), "s", "a.ts", "", &ChunkOptions::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let mut options = ChunkOptions::default();
        options.chunk_size = 0;
        assert!(chunk_file(&tokenizer(), "s", "a.ts", "x", &options).is_err());

        let mut options = ChunkOptions::default();
        options.chunk_overlap = options.chunk_size;
        assert!(chunk_file(&tokenizer(), "s", "a.ts", "x", &options).is_err());
    }

    #[test]
    fn test_ast_mode_on_supported_extension() {
        let content = "export function add(a, b) {\n  return a + b;\n}\n";
        let chunks =
            chunk_file(&tokenizer(), "s", "a.ts", content, &ChunkOptions::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Function);
        assert_eq!(chunks[0].unit_name.as_deref(), Some("add"));
    }

    #[test]
    fn test_ast_off_yields_token_blocks() {
        let content = "export function add(a, b) {\n  return a + b;\n}\n";
        let mut options = ChunkOptions::default();
        options.use_ast = false;
        let chunks = chunk_file(&tokenizer(), "s", "a.ts", content, &options).unwrap();
        assert!(chunks.iter().all(|c| c.kind == ChunkKind::TokenBlock));
    }

    #[test]
    fn test_unsupported_extension_falls_back() {
        let content = "SELECT * FROM users;\n";
        let chunks =
            chunk_file(&tokenizer(), "s", "query.sql", content, &ChunkOptions::default())
                .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::TokenBlock);
    }

    #[test]
    fn test_invariants_hold_both_modes() {
        let content = "import { x } from './x';\n\nexport function f() {\n  return x;\n}\n\nexport class C {\n  method() {}\n}\n";
        for use_ast in [true, false] {
            let mut options = ChunkOptions::default();
            options.use_ast = use_ast;
            let chunks = chunk_file(&tokenizer(), "s", "a.ts", content, &options).unwrap();
            assert!(!chunks.is_empty());
            assert_chunk_invariants(&chunks, content);
        }
    }

    #[test]
    fn test_rechunking_stable_ids() {
        let content = "export function f() {}\nexport function g() {}\n";
        let first =
            chunk_file(&tokenizer(), "s", "a.ts", content, &ChunkOptions::default()).unwrap();
        let second =
            chunk_file(&tokenizer(), "s", "a.ts", content, &ChunkOptions::default()).unwrap();
        let first_ids: Vec<&str> = first.iter().map(|c| c.id.as_str()).collect();
        let second_ids: Vec<&str> = second.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// P1 + P2 + P3 over arbitrary small files in both modes.
        #[test]
        fn chunk_invariants_hold(
            lines in proptest::collection::vec("[ -~]{0,60}", 1..40),
            use_ast in any::<bool>(),
        ) {
            let content = lines.join("\n");
            if content.is_empty() {
                return Ok(());
            }
            let mut options = ChunkOptions::default();
            options.chunk_size = 40;
            options.chunk_overlap = 8;
            options.use_ast = use_ast;
            let tokenizer = Tokenizer::new();
            let chunks =
                chunk_file(&tokenizer, "s", "file.ts", &content, &options).unwrap();
            super::tests::assert_chunk_invariants(&chunks, &content);

            let again = chunk_file(&tokenizer, "s", "file.ts", &content, &options).unwrap();
            let ids_a: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
            let ids_b: Vec<&str> = again.iter().map(|c| c.id.as_str()).collect();
            prop_assert_eq!(ids_a, ids_b);
        }
    }
}
