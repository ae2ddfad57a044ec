//! Symbol extraction over chunk content.
//!
//! Recognizes top-level and member declarations per language by
//! line-scanning patterns, reporting absolute line numbers (the chunk's
//! start line is added to the relative index). Block ends are found by
//! brace counting (C-family, Go, Rust), indentation drop (Python), or the
//! terminating semicolon (type aliases).

// The symbol patterns are compile-time constants.
#![allow(clippy::expect_used)]

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Kind of extracted symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Function declaration.
    Function,
    /// Method inside a class or impl block.
    Method,
    /// Class declaration.
    Class,
    /// Interface declaration.
    Interface,
    /// Type alias.
    Type,
    /// Constant binding.
    Constant,
    /// Struct declaration.
    Struct,
    /// Enum declaration.
    Enum,
    /// Trait declaration.
    Trait,
}

impl SymbolKind {
    /// Stable string form for output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Constant => "constant",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Trait => "trait",
        }
    }
}

/// One extracted symbol declaration.
#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    /// Declared name.
    pub name: String,
    /// What was declared.
    pub kind: SymbolKind,
    /// 1-indexed line of the declaration in the original file.
    pub start_line: usize,
    /// 1-indexed line where the declaration's block ends.
    pub end_line: usize,
    /// The declaration line, stripped of its opening brace or colon.
    pub signature: String,
}

/// How a language closes declaration blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockStyle {
    Braces,
    Indent,
    Semicolon,
}

struct SymbolPattern {
    regex: &'static Regex,
    kind: SymbolKind,
    block: BlockStyle,
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: OnceLock<Regex> = OnceLock::new();
        $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

fn patterns_for(ext: &str) -> &'static [SymbolPattern] {
    macro_rules! table {
        ($name:ident, $($re:ident : $pat:expr => $kind:expr, $block:expr);+ $(;)?) => {{
            static $name: OnceLock<Vec<SymbolPattern>> = OnceLock::new();
            $name.get_or_init(|| vec![$(SymbolPattern {
                regex: static_regex!($re, $pat),
                kind: $kind,
                block: $block,
            }),+])
        }};
    }

    match ext {
        "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" => table!(
            TSJS,
            SYM_TS_FN: r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)" => SymbolKind::Function, BlockStyle::Braces;
            SYM_TS_CLASS: r"^\s*(?:export\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)" => SymbolKind::Class, BlockStyle::Braces;
            SYM_TS_IFACE: r"^\s*(?:export\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)" => SymbolKind::Interface, BlockStyle::Braces;
            SYM_TS_TYPE: r"^\s*(?:export\s+)?type\s+(?P<name>[A-Za-z_$][\w$]*)" => SymbolKind::Type, BlockStyle::Semicolon;
            SYM_TS_CONST: r"^\s*(?:export\s+)?const\s+(?P<name>[A-Za-z_$][\w$]*)[^=]*=\s*(?:async\s+)?(?:function\b|\(|[A-Za-z_$][\w$]*\s*=>)" => SymbolKind::Constant, BlockStyle::Braces;
            SYM_TS_METHOD: r"^\s+(?:public\s+|private\s+|protected\s+)?(?:static\s+)?(?:async\s+)?(?:get\s+|set\s+)?(?P<name>[A-Za-z_$][\w$]*)\s*\([^)]*\)\s*(?::[^{]+)?\{" => SymbolKind::Method, BlockStyle::Braces;
        ),
        "py" => table!(
            PY,
            SYM_PY_DEF: r"^\s*(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)" => SymbolKind::Function, BlockStyle::Indent;
            SYM_PY_CLASS: r"^\s*class\s+(?P<name>[A-Za-z_]\w*)" => SymbolKind::Class, BlockStyle::Indent;
        ),
        "go" => table!(
            GO,
            SYM_GO_FUNC: r"^func\s+(?:\([^)]*\)\s*)?(?P<name>[A-Za-z_]\w*)" => SymbolKind::Function, BlockStyle::Braces;
            SYM_GO_STRUCT: r"^type\s+(?P<name>[A-Za-z_]\w*)\s+struct\b" => SymbolKind::Struct, BlockStyle::Braces;
            SYM_GO_IFACE: r"^type\s+(?P<name>[A-Za-z_]\w*)\s+interface\b" => SymbolKind::Interface, BlockStyle::Braces;
            SYM_GO_TYPE: r"^type\s+(?P<name>[A-Za-z_]\w*)" => SymbolKind::Type, BlockStyle::Semicolon;
            SYM_GO_CONST: r"^(?:var|const)\s+(?P<name>[A-Za-z_]\w*)" => SymbolKind::Constant, BlockStyle::Semicolon;
        ),
        "rs" => table!(
            RS,
            SYM_RS_FN: r"^(?P<indent>\s*)(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+\S+\s+)?fn\s+(?P<name>[A-Za-z_]\w*)" => SymbolKind::Function, BlockStyle::Braces;
            SYM_RS_STRUCT: r"^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+(?P<name>[A-Za-z_]\w*)" => SymbolKind::Struct, BlockStyle::Braces;
            SYM_RS_ENUM: r"^\s*(?:pub(?:\([^)]*\))?\s+)?enum\s+(?P<name>[A-Za-z_]\w*)" => SymbolKind::Enum, BlockStyle::Braces;
            SYM_RS_TRAIT: r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+(?P<name>[A-Za-z_]\w*)" => SymbolKind::Trait, BlockStyle::Braces;
            SYM_RS_TYPE: r"^\s*(?:pub(?:\([^)]*\))?\s+)?type\s+(?P<name>[A-Za-z_]\w*)" => SymbolKind::Type, BlockStyle::Semicolon;
            SYM_RS_CONST: r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const|static)\s+(?P<name>[A-Za-z_]\w*)" => SymbolKind::Constant, BlockStyle::Semicolon;
        ),
        _ => &[],
    }
}

/// Control-flow keywords that the C-family method pattern would otherwise
/// mistake for declarations (`if (x) {`, `for (...) {`).
const KEYWORD_NAMES: &[&str] = &[
    "if", "else", "for", "while", "switch", "catch", "do", "return", "new", "typeof",
];

/// Extracts symbols from `content`, which starts at absolute line
/// `start_line` (1-indexed) of `file_path`.
#[must_use]
pub fn extract(content: &str, file_path: &str, start_line: usize) -> Vec<Symbol> {
    let ext = file_path
        .rsplit_once('.')
        .map_or(String::new(), |(_, e)| e.to_lowercase());
    let patterns = patterns_for(&ext);
    if patterns.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut symbols = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        for pattern in patterns {
            let Some(caps) = pattern.regex.captures(line) else {
                continue;
            };
            let Some(name) = caps.name("name") else {
                continue;
            };
            if KEYWORD_NAMES.contains(&name.as_str()) {
                continue;
            }
            // Methods are indented function-shaped lines; plain functions
            // at indent are still functions in Rust (nested fns are rare,
            // methods live in impl blocks either way).
            let kind = if matches!(ext.as_str(), "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs")
                && pattern.kind == SymbolKind::Function
                && line.starts_with(char::is_whitespace)
            {
                SymbolKind::Method
            } else if ext == "rs"
                && pattern.kind == SymbolKind::Function
                && line.starts_with(char::is_whitespace)
            {
                SymbolKind::Method
            } else {
                pattern.kind
            };
            let end_idx = block_end(&lines, idx, pattern.block);
            symbols.push(Symbol {
                name: name.as_str().to_string(),
                kind,
                start_line: start_line + idx,
                end_line: start_line + end_idx,
                signature: signature_of(line),
            });
            break;
        }
    }
    symbols
}

/// Finds the 0-based index of the last line of the block opened at `start`.
fn block_end(lines: &[&str], start: usize, style: BlockStyle) -> usize {
    match style {
        BlockStyle::Braces => brace_end(lines, start),
        BlockStyle::Indent => indent_end(lines, start),
        BlockStyle::Semicolon => semicolon_end(lines, start),
    }
}

fn brace_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return idx;
        }
        // A braceless declaration line (e.g. `struct Unit;`) ends where it
        // starts.
        if !opened && idx == start && line.trim_end().ends_with(';') {
            return idx;
        }
    }
    lines.len() - 1
}

fn indent_end(lines: &[&str], start: usize) -> usize {
    let base = indent_of(lines[start]);
    let mut last = start;
    for (idx, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= base {
            return last;
        }
        last = idx;
    }
    last
}

fn semicolon_end(lines: &[&str], start: usize) -> usize {
    for (idx, line) in lines.iter().enumerate().skip(start) {
        if line.trim_end().ends_with(';') {
            return idx;
        }
    }
    lines.len() - 1
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// The declaration line stripped of its opening brace or trailing colon.
fn signature_of(line: &str) -> String {
    let trimmed = line.trim();
    let cut = trimmed
        .rfind('{')
        .or_else(|| trimmed.rfind(':').filter(|&i| i == trimmed.len() - 1));
    match cut {
        Some(idx) => trimmed[..idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Minimum query length for fuzzy substring matching.
const MIN_FUZZY_LEN: usize = 3;

/// Searches symbols by name.
///
/// Exact matches rank first, then case-insensitive substring matches
/// (only when the query is at least three characters), ordered by
/// shortest name then alphabetically.
#[must_use]
pub fn search(symbols: Vec<Symbol>, query: &str, exact_only: bool) -> Vec<Symbol> {
    let query_lower = query.to_lowercase();
    let mut exact: Vec<Symbol> = Vec::new();
    let mut fuzzy: Vec<Symbol> = Vec::new();
    for symbol in symbols {
        if symbol.name == query {
            exact.push(symbol);
        } else if !exact_only
            && query.len() >= MIN_FUZZY_LEN
            && symbol.name.to_lowercase().contains(&query_lower)
        {
            fuzzy.push(symbol);
        }
    }
    let by_name = |a: &Symbol, b: &Symbol| {
        a.name
            .len()
            .cmp(&b.name.len())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.start_line.cmp(&b.start_line))
    };
    exact.sort_by(by_name);
    fuzzy.sort_by(by_name);
    exact.extend(fuzzy);
    exact
}
