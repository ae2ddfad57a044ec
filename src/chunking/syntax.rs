//! Syntax-aware chunking.
//!
//! Produces one chunk per top-level declaration by line-scanning with
//! per-language patterns. This is best-effort, not compiler-grade parsing:
//! when a file's extension is unsupported or no declaration is found, the
//! caller falls back to token-block chunking.

// The declaration patterns are compile-time constants; failing to compile
// one is a programmer error caught by the pattern tests below.
#![allow(clippy::expect_used)]

use crate::chunking::{HEADER_MIN_TOKENS, split_lines};
use crate::core::{Chunk, ChunkKind};
use crate::token::Tokenizer;
use regex::Regex;
use std::sync::OnceLock;

/// Languages with declaration patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    /// TypeScript/JavaScript family: ts, tsx, js, jsx, mjs, cjs.
    TsJs,
    Python,
    Go,
    Rust,
    Markdown,
}

impl Language {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" => Some(Self::TsJs),
            "py" => Some(Self::Python),
            "go" => Some(Self::Go),
            "rs" => Some(Self::Rust),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// One recognized top-level declaration.
struct Decl {
    /// 0-based index of the declaration line.
    line_idx: usize,
    kind: ChunkKind,
    name: Option<String>,
    exported: bool,
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: OnceLock<Regex> = OnceLock::new();
        $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

/// Pattern table for one language: `(regex, kind)`. Each regex is anchored
/// at the line start (top-level declarations only) and captures `name` and
/// optionally `export`.
fn patterns(lang: Language) -> &'static [(&'static Regex, ChunkKind)] {
    macro_rules! table {
        ($name:ident, $($re:ident : $pat:expr => $kind:expr),+ $(,)?) => {{
            static $name: OnceLock<Vec<(&'static Regex, ChunkKind)>> = OnceLock::new();
            $name.get_or_init(|| vec![$((static_regex!($re, $pat), $kind)),+])
        }};
    }

    match lang {
        Language::TsJs => table!(
            TSJS,
            TS_FN_DEFAULT: r"^export\s+default\s+(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)?" => ChunkKind::Function,
            TS_FN: r"^(?P<export>export\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)" => ChunkKind::Function,
            TS_CLASS: r"^(?P<export>export\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)" => ChunkKind::Class,
            TS_IFACE: r"^(?P<export>export\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)" => ChunkKind::Interface,
            TS_TYPE: r"^(?P<export>export\s+)?type\s+(?P<name>[A-Za-z_$][\w$]*)" => ChunkKind::TypeAlias,
            TS_CONST_FN: r"^(?P<export>export\s+)?const\s+(?P<name>[A-Za-z_$][\w$]*)[^=]*=\s*(?:async\s+)?(?:function\b|\(|[A-Za-z_$][\w$]*\s*=>)" => ChunkKind::Constant,
        ),
        Language::Python => table!(
            PY,
            PY_DEF: r"^(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::Function,
            PY_CLASS: r"^class\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::Class,
        ),
        Language::Go => table!(
            GO,
            GO_FUNC: r"^func\s+(?:\([^)]*\)\s*)?(?P<name>[A-Za-z_]\w*)" => ChunkKind::Function,
            GO_STRUCT: r"^type\s+(?P<name>[A-Za-z_]\w*)\s+struct\b" => ChunkKind::Struct,
            GO_IFACE: r"^type\s+(?P<name>[A-Za-z_]\w*)\s+interface\b" => ChunkKind::Interface,
            GO_TYPE: r"^type\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::TypeAlias,
            GO_CONST: r"^(?:var|const)\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::Constant,
        ),
        Language::Rust => table!(
            RS,
            RS_FN: r"^(?P<export>pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+\S+\s+)?fn\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::Function,
            RS_STRUCT: r"^(?P<export>pub(?:\([^)]*\))?\s+)?struct\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::Struct,
            RS_ENUM: r"^(?P<export>pub(?:\([^)]*\))?\s+)?enum\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::Enum,
            RS_TRAIT: r"^(?P<export>pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::Trait,
            RS_IMPL: r"^(?:unsafe\s+)?impl(?:<[^>]*>)?\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::Impl,
            RS_TYPE: r"^(?P<export>pub(?:\([^)]*\))?\s+)?type\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::TypeAlias,
            RS_CONST: r"^(?P<export>pub(?:\([^)]*\))?\s+)?(?:const|static)\s+(?P<name>[A-Za-z_]\w*)" => ChunkKind::Constant,
        ),
        Language::Markdown => table!(
            MD,
            MD_HEADING: r"^#{1,6}\s+(?P<name>.+)" => ChunkKind::Section,
        ),
    }
}

/// Scans a line for a top-level declaration.
fn match_decl(lang: Language, line_idx: usize, line: &str) -> Option<Decl> {
    for (regex, kind) in patterns(lang) {
        if let Some(caps) = regex.captures(line) {
            let name = caps
                .name("name")
                .map(|m| m.as_str().trim().to_string())
                .filter(|n| !n.is_empty());
            let exported = match lang {
                Language::TsJs => line.starts_with("export"),
                Language::Rust => caps.name("export").is_some(),
                // Go exports by capitalization.
                Language::Go => name
                    .as_deref()
                    .and_then(|n| n.chars().next())
                    .is_some_and(char::is_uppercase),
                Language::Python | Language::Markdown => false,
            };
            return Some(Decl {
                line_idx,
                kind: *kind,
                name,
                exported,
            });
        }
    }
    None
}

/// Syntax-aware chunking of one file.
///
/// Returns `None` when the extension has no pattern table or no top-level
/// declaration is found, signalling the caller to fall back to token-block
/// chunking. The file preamble becomes its own `header` chunk when its
/// token count exceeds [`HEADER_MIN_TOKENS`]; a shorter preamble is folded
/// into the first declaration chunk so line coverage stays complete.
#[must_use]
pub fn syntax_chunks(
    tokenizer: &Tokenizer,
    source_id: &str,
    file_path: &str,
    content: &str,
) -> Option<Vec<Chunk>> {
    let ext = file_path.rsplit_once('.').map_or("", |(_, e)| e);
    let lang = Language::from_extension(&ext.to_lowercase())?;

    let lines = split_lines(content);
    let decls: Vec<Decl> = lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| match_decl(lang, idx, line))
        .collect();
    if decls.is_empty() {
        return None;
    }

    let mut chunks = Vec::with_capacity(decls.len() + 1);
    let first_decl_line = decls[0].line_idx;
    let mut fold_header_into_first = false;

    if first_decl_line > 0 {
        let header_content = lines[..first_decl_line].join("\n");
        if tokenizer.count(&header_content) > HEADER_MIN_TOKENS {
            let tokens = tokenizer.count(&header_content);
            chunks.push(Chunk::new(
                source_id,
                file_path,
                header_content,
                1,
                first_decl_line,
                tokens,
                ChunkKind::Header,
            ));
        } else {
            fold_header_into_first = true;
        }
    }

    for (i, decl) in decls.iter().enumerate() {
        let start = if i == 0 && fold_header_into_first {
            0
        } else {
            decl.line_idx
        };
        let end = decls
            .get(i + 1)
            .map_or(lines.len() - 1, |next| next.line_idx - 1);
        let chunk_content = lines[start..=end].join("\n");
        let tokens = tokenizer.count(&chunk_content);
        let mut chunk = Chunk::new(
            source_id,
            file_path,
            chunk_content,
            start + 1,
            end + 1,
            tokens,
            decl.kind,
        );
        chunk.unit_name = decl.name.clone();
        chunk.exported = decl.exported;
        chunks.push(chunk);
    }

    Some(chunks)
}
