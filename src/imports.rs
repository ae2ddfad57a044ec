//! Import analysis and the dependency graph.
//!
//! Extracts import specifiers by pattern-matching (not full parsing),
//! classifies them, resolves relative specifiers against the indexed file
//! set, and builds a directed `file -> [file]` graph used by the ranker's
//! import boost. The graph lives only in memory; it is derived from chunk
//! content at select-time when the caller asks for import boosting.

// Specifier patterns are compile-time constants.
#![allow(clippy::expect_used)]

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::OnceLock;

/// Resolution order for extensionless relative specifiers.
const RESOLVE_EXTENSIONS: [&str; 5] = ["ts", "tsx", "js", "jsx", "mjs"];

/// How a specifier addresses its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    /// Starts with `.` or `..`.
    Relative,
    /// Starts with `/` or a drive letter.
    Absolute,
    /// Anything else: a package name.
    Package,
}

/// One extracted import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpecifier {
    /// The raw specifier text between the quotes.
    pub raw: String,
    /// Classification of the specifier.
    pub kind: SpecifierKind,
}

fn specifier_patterns() -> &'static [&'static Regex] {
    macro_rules! static_regex {
        ($name:ident, $pattern:expr) => {{
            static $name: OnceLock<Regex> = OnceLock::new();
            $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
        }};
    }
    static PATTERNS: OnceLock<Vec<&'static Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            // import defaultExport from '...'; import * as ns from '...';
            // import { a, b } from '...'; export { x } from '...';
            // export * from '...'
            static_regex!(
                ES_FROM,
                r#"(?m)^\s*(?:import|export)\b[^'"]*?\bfrom\s*['"](?P<spec>[^'"]+)['"]"#
            ),
            // Side-effect-only: import '...';
            static_regex!(ES_BARE, r#"(?m)^\s*import\s*['"](?P<spec>[^'"]+)['"]"#),
            // CommonJS: require('...')
            static_regex!(CJS, r#"\brequire\s*\(\s*['"](?P<spec>[^'"]+)['"]\s*\)"#),
            // Dynamic: import('...')
            static_regex!(DYN, r#"\bimport\s*\(\s*['"](?P<spec>[^'"]+)['"]\s*\)"#),
        ]
    })
}

/// Classifies a raw specifier.
#[must_use]
pub fn classify(raw: &str) -> SpecifierKind {
    if raw.starts_with('.') {
        SpecifierKind::Relative
    } else if raw.starts_with('/') || is_drive_prefixed(raw) {
        SpecifierKind::Absolute
    } else {
        SpecifierKind::Package
    }
}

fn is_drive_prefixed(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Extracts all import specifiers from file content, in order of first
/// appearance, de-duplicated.
#[must_use]
pub fn extract_specifiers(content: &str) -> Vec<ImportSpecifier> {
    let mut seen = BTreeSet::new();
    let mut ordered: Vec<(usize, ImportSpecifier)> = Vec::new();
    for regex in specifier_patterns() {
        for caps in regex.captures_iter(content) {
            if let Some(m) = caps.name("spec") {
                let raw = m.as_str().to_string();
                if seen.insert(raw.clone()) {
                    ordered.push((
                        m.start(),
                        ImportSpecifier {
                            kind: classify(&raw),
                            raw,
                        },
                    ));
                }
            }
        }
    }
    ordered.sort_by_key(|(offset, _)| *offset);
    ordered.into_iter().map(|(_, spec)| spec).collect()
}

/// Resolves a relative specifier from `importer` (a source-relative path)
/// against the set of indexed paths.
///
/// Tries the literal path, then each extension in [`RESOLVE_EXTENSIONS`],
/// then `<path>/index.<ext>` for the same extensions; the first existing
/// path wins.
#[must_use]
pub fn resolve_relative(
    importer: &str,
    raw: &str,
    indexed: &HashSet<String>,
) -> Option<String> {
    let base_dir = importer.rsplit_once('/').map_or("", |(dir, _)| dir);
    let joined = normalize(base_dir, raw)?;

    if indexed.contains(&joined) {
        return Some(joined);
    }
    for ext in RESOLVE_EXTENSIONS {
        let candidate = format!("{joined}.{ext}");
        if indexed.contains(&candidate) {
            return Some(candidate);
        }
    }
    for ext in RESOLVE_EXTENSIONS {
        let candidate = format!("{joined}/index.{ext}");
        if indexed.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Joins `base_dir` and a `./`/`../` specifier, collapsing the dot
/// segments. Returns `None` when `..` escapes the source root.
fn normalize(base_dir: &str, raw: &str) -> Option<String> {
    let mut segments: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').collect()
    };
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

/// Directed dependency graph over source-relative file paths.
///
/// `edges` maps importer to imported files; `reverse` is maintained
/// alongside so "who imports X" is O(1) per file.
#[derive(Debug, Default)]
pub struct ImportGraph {
    edges: BTreeMap<String, Vec<String>>,
    reverse: BTreeMap<String, Vec<String>>,
}

impl ImportGraph {
    /// Builds the graph from `(path, content)` pairs. Only relative
    /// specifiers that resolve to an indexed path produce edges.
    #[must_use]
    pub fn build(files: &[(String, String)]) -> Self {
        let indexed: HashSet<String> = files.iter().map(|(path, _)| path.clone()).collect();
        let mut graph = Self::default();
        for (path, content) in files {
            for spec in extract_specifiers(content) {
                if spec.kind != SpecifierKind::Relative {
                    continue;
                }
                if let Some(target) = resolve_relative(path, &spec.raw, &indexed)
                    && target != *path
                {
                    graph.add_edge(path, &target);
                }
            }
        }
        graph
    }

    fn add_edge(&mut self, from: &str, to: &str) {
        let targets = self.edges.entry(from.to_string()).or_default();
        if !targets.contains(&to.to_string()) {
            targets.push(to.to_string());
            self.reverse
                .entry(to.to_string())
                .or_default()
                .push(from.to_string());
        }
    }

    /// Files directly imported by `path`.
    #[must_use]
    pub fn imports_of(&self, path: &str) -> &[String] {
        self.edges.get(path).map_or(&[], Vec::as_slice)
    }

    /// Files that directly import `path`.
    #[must_use]
    pub fn importers_of(&self, path: &str) -> &[String] {
        self.reverse.get(path).map_or(&[], Vec::as_slice)
    }

    /// Whether the graph has any edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// All files reachable from `seeds` by following import edges up to
    /// `depth` hops. Each node is visited at most once, so cycles are
    /// safe. The seeds themselves are not included unless reachable.
    #[must_use]
    pub fn imported_within(&self, seeds: &[&str], depth: usize) -> HashSet<String> {
        let mut reached = HashSet::new();
        let mut visited: HashSet<&str> = seeds.iter().copied().collect();
        let mut queue: VecDeque<(&str, usize)> =
            seeds.iter().map(|s| (*s, 0usize)).collect();
        while let Some((node, dist)) = queue.pop_front() {
            if dist >= depth {
                continue;
            }
            for target in self.imports_of(node) {
                reached.insert(target.clone());
                if visited.insert(target) {
                    queue.push_back((target, dist + 1));
                }
            }
        }
        reached
    }
}
