//! Chunk representation.
//!
//! A chunk is a contiguous, immutable span of a file used as the unit of
//! retrieval. Its line range is 1-indexed and inclusive, and its content is
//! the exact substring of the file covered by that range.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of chunk produced by the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkKind {
    /// Fixed-budget block of lines (the non-syntax-aware mode, and the
    /// fallback for unparseable files).
    TokenBlock,
    /// Top-level function declaration.
    Function,
    /// Class declaration.
    Class,
    /// Interface declaration.
    Interface,
    /// Type alias declaration.
    TypeAlias,
    /// Exported constant (including function expressions bound to one).
    Constant,
    /// Struct declaration (Rust, Go).
    Struct,
    /// Enum declaration.
    Enum,
    /// Trait declaration.
    Trait,
    /// Impl block.
    Impl,
    /// File preamble: imports, license comments, module-scope statements
    /// before the first declaration.
    Header,
    /// Markdown heading section.
    Section,
}

impl ChunkKind {
    /// Stable string form stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TokenBlock => "token-block",
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::TypeAlias => "type",
            Self::Constant => "constant",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::Impl => "impl",
            Self::Header => "header",
            Self::Section => "section",
        }
    }

    /// Parses the stored string form. Unknown strings map to
    /// [`ChunkKind::TokenBlock`] so old databases stay readable.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "function" => Self::Function,
            "class" => Self::Class,
            "interface" => Self::Interface,
            "type" => Self::TypeAlias,
            "constant" => Self::Constant,
            "struct" => Self::Struct,
            "enum" => Self::Enum,
            "trait" => Self::Trait,
            "impl" => Self::Impl,
            "header" => Self::Header,
            "section" => Self::Section,
            _ => Self::TokenBlock,
        }
    }

    /// Whether this kind represents a declaration-level view of the file
    /// (everything except raw token blocks). Map mode filters to these.
    #[must_use]
    pub const fn is_declaration(self) -> bool {
        !matches!(self, Self::TokenBlock)
    }
}

/// A contiguous, immutable span of a file used as a retrieval unit.
///
/// Invariants:
/// - `start_line <= end_line`, both 1-indexed and inclusive
/// - `content` equals the file's lines `start_line..=end_line` joined by `\n`
/// - a chunk never spans multiple files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Content-addressed id, stable across re-indexes of identical content.
    pub id: String,

    /// Id of the source this chunk's file belongs to.
    pub source_id: String,

    /// Path of the file, relative to the source root.
    pub file_path: String,

    /// Exact substring of the file covered by the line range.
    pub content: String,

    /// First line of the chunk (1-indexed).
    pub start_line: usize,

    /// Last line of the chunk (1-indexed, inclusive).
    pub end_line: usize,

    /// Approximate token count of `content`.
    pub tokens: usize,

    /// What the chunker recognized this span as.
    pub kind: ChunkKind,

    /// Declared name for syntax-aware chunks (`"authHandler"` etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,

    /// Whether the declaration is exported from its module.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exported: bool,

    /// L2-normalized embedding vector, when one has been computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Creates a chunk, deriving its id from the identity fields.
    #[must_use]
    pub fn new(
        source_id: &str,
        file_path: &str,
        content: String,
        start_line: usize,
        end_line: usize,
        tokens: usize,
        kind: ChunkKind,
    ) -> Self {
        let id = chunk_id(source_id, file_path, start_line, &content);
        Self {
            id,
            source_id: source_id.to_string(),
            file_path: file_path.to_string(),
            content,
            start_line,
            end_line,
            tokens,
            kind,
            unit_name: None,
            exported: false,
            embedding: None,
        }
    }

    /// Number of lines covered by this chunk.
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// File extension of the chunk's path, lowercased, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        self.file_path.rsplit_once('.').map_or("", |(_, ext)| ext)
    }

    /// Whether this chunk's line range touches or overlaps another chunk's
    /// range in the same file.
    #[must_use]
    pub fn is_adjacent_to(&self, other: &Self) -> bool {
        self.file_path == other.file_path
            && self.start_line <= other.end_line.saturating_add(1)
            && other.start_line <= self.end_line.saturating_add(1)
    }
}

/// Computes the content-addressed chunk id.
///
/// The id is a sha256 over `source_id \0 file_path \0 start_line \0 content`,
/// rendered as the first 16 hex characters prefixed with `chunk_`. Identical
/// inputs always produce identical ids (re-chunking an unchanged file yields
/// the same ids in the same order).
#[must_use]
pub fn chunk_id(source_id: &str, file_path: &str, start_line: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update([0]);
    hasher.update(file_path.as_bytes());
    hasher.update([0]);
    hasher.update(start_line.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut id = String::with_capacity(6 + 16);
    id.push_str("chunk_");
    for byte in &digest[..8] {
        use std::fmt::Write;
        let _ = write!(id, "{byte:02x}");
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk::new(
            "app",
            "src/auth.ts",
            "export function login() {\n  return true;\n}".to_string(),
            10,
            12,
            9,
            ChunkKind::Function,
        )
    }

    #[test]
    fn test_chunk_id_format() {
        let chunk = sample_chunk();
        assert!(chunk.id.starts_with("chunk_"));
        assert_eq!(chunk.id.len(), "chunk_".len() + 16);
        assert!(chunk.id["chunk_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_chunk_id_stable() {
        let a = chunk_id("app", "src/a.ts", 1, "let x = 1;");
        let b = chunk_id("app", "src/a.ts", 1, "let x = 1;");
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunk_id_sensitive_to_identity_fields() {
        let base = chunk_id("app", "src/a.ts", 1, "let x = 1;");
        assert_ne!(base, chunk_id("lib", "src/a.ts", 1, "let x = 1;"));
        assert_ne!(base, chunk_id("app", "src/b.ts", 1, "let x = 1;"));
        assert_ne!(base, chunk_id("app", "src/a.ts", 2, "let x = 1;"));
        assert_ne!(base, chunk_id("app", "src/a.ts", 1, "let x = 2;"));
    }

    #[test]
    fn test_chunk_id_separator_prevents_collisions() {
        // Without the NUL separators, ("ab","c") and ("a","bc") would hash
        // identically.
        let a = chunk_id("ab", "c", 1, "x");
        let b = chunk_id("a", "bc", 1, "x");
        assert_ne!(a, b);
    }

    #[test]
    fn test_line_count() {
        let chunk = sample_chunk();
        assert_eq!(chunk.line_count(), 3);
    }

    #[test]
    fn test_extension() {
        let chunk = sample_chunk();
        assert_eq!(chunk.extension(), "ts");

        let mut no_ext = sample_chunk();
        no_ext.file_path = "Makefile".to_string();
        assert_eq!(no_ext.extension(), "");
    }

    #[test]
    fn test_adjacency() {
        let mut a = sample_chunk();
        a.start_line = 1;
        a.end_line = 40;
        let mut b = sample_chunk();
        b.start_line = 35;
        b.end_line = 80;
        let mut c = sample_chunk();
        c.start_line = 41;
        c.end_line = 50;
        let mut d = sample_chunk();
        d.start_line = 43;
        d.end_line = 50;

        assert!(a.is_adjacent_to(&b)); // overlap
        assert!(a.is_adjacent_to(&c)); // touching
        assert!(!a.is_adjacent_to(&d)); // gap of one line

        let mut other_file = b.clone();
        other_file.file_path = "src/other.ts".to_string();
        assert!(!a.is_adjacent_to(&other_file));
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            ChunkKind::TokenBlock,
            ChunkKind::Function,
            ChunkKind::Class,
            ChunkKind::Interface,
            ChunkKind::TypeAlias,
            ChunkKind::Constant,
            ChunkKind::Struct,
            ChunkKind::Enum,
            ChunkKind::Trait,
            ChunkKind::Impl,
            ChunkKind::Header,
            ChunkKind::Section,
        ] {
            assert_eq!(ChunkKind::parse(kind.as_str()), kind);
        }
        assert_eq!(ChunkKind::parse("garbage"), ChunkKind::TokenBlock);
    }

    #[test]
    fn test_declaration_kinds() {
        assert!(!ChunkKind::TokenBlock.is_declaration());
        assert!(ChunkKind::Function.is_declaration());
        assert!(ChunkKind::Header.is_declaration());
    }

    #[test]
    fn test_serialization() {
        let chunk = sample_chunk();
        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}
