//! Multi-signal ranking.
//!
//! Combines vector similarity with lexical path/content/symbol signals and
//! a small file-type prior:
//!
//! ```text
//! score = 0.55 * similarity
//!       + 0.15 * path_match
//!       + 0.15 * content_match
//!       + 0.10 * symbol_match
//!       + 0.05 * file_type_boost
//! ```
//!
//! An optional import boost lifts chunks whose file is imported (directly
//! or within two hops) by a file holding a top-ranked chunk. Ties break by
//! similarity, then `(file_path, start_line)`, so ranking is fully
//! deterministic.

use crate::imports::ImportGraph;
use crate::select::retriever::Candidate;
use crate::symbols;
use serde::Serialize;
use std::collections::HashSet;

/// Signal weights.
const WEIGHT_SIMILARITY: f32 = 0.55;
const WEIGHT_PATH: f32 = 0.15;
const WEIGHT_CONTENT: f32 = 0.15;
const WEIGHT_SYMBOL: f32 = 0.10;
const WEIGHT_FILE_TYPE: f32 = 0.05;

/// Additive boost for chunks reachable through the import graph.
const IMPORT_BOOST: f32 = 0.08;

/// Import-boost traversal depth.
const IMPORT_BOOST_DEPTH: usize = 2;

/// How many top-ranked chunks seed the import boost.
const IMPORT_BOOST_TOP_N: usize = 10;

/// Minimum query-token length considered by the lexical signals.
const MIN_TOKEN_LEN: usize = 3;

/// Query words ignored by the lexical signals.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "has", "was", "one", "our",
    "out", "use", "how", "that", "this", "with", "from", "they", "what", "when", "where", "which",
    "does", "about", "into", "code", "file", "files", "function", "functions", "show", "find",
    "get", "make", "made", "used", "using", "work", "works",
];

/// The five ranking signals, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Signals {
    /// Vector similarity from the retriever.
    pub similarity: f32,
    /// Fraction of query tokens appearing in the file path.
    pub path_match: f32,
    /// Fraction of query tokens appearing in the chunk content.
    pub content_match: f32,
    /// Symbol-name agreement with the query tokens.
    pub symbol_match: f32,
    /// Extension prior: source code over markdown over config over data.
    pub file_type_boost: f32,
}

/// A candidate with its signals and composite score.
#[derive(Debug, Clone)]
pub struct RankedChunk {
    /// The chunk.
    pub chunk: crate::core::Chunk,
    /// Signal breakdown, kept for `--explain`.
    pub signals: Signals,
    /// Composite score in `[0, 1]`.
    pub score: f32,
}

/// Lowercased query tokens of length >= 3 with stopwords removed.
#[must_use]
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for word in query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.len() >= MIN_TOKEN_LEN)
    {
        let lower = word.to_lowercase();
        if STOPWORDS.contains(&lower.as_str()) || tokens.contains(&lower) {
            continue;
        }
        tokens.push(lower);
    }
    tokens
}

/// Extension prior. Source code > markdown > config > data.
#[must_use]
pub fn file_type_boost(extension: &str) -> f32 {
    match extension {
        "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" | "py" | "go" | "rs" => 1.0,
        "md" | "markdown" => 0.7,
        "yaml" | "yml" | "toml" | "ini" | "cfg" => 0.5,
        "json" | "csv" | "xml" => 0.3,
        _ => 0.2,
    }
}

/// Ranks candidates for `query`, optionally applying the import boost.
#[must_use]
pub fn rank(
    candidates: Vec<Candidate>,
    query: &str,
    graph: Option<&ImportGraph>,
) -> Vec<RankedChunk> {
    let tokens = query_tokens(query);
    let mut ranked: Vec<RankedChunk> = candidates
        .into_iter()
        .map(|candidate| score_candidate(candidate, &tokens))
        .collect();
    sort_ranked(&mut ranked);

    if let Some(graph) = graph
        && !graph.is_empty()
    {
        apply_import_boost(&mut ranked, graph);
        sort_ranked(&mut ranked);
    }

    ranked
}

fn score_candidate(candidate: Candidate, tokens: &[String]) -> RankedChunk {
    let Candidate { chunk, similarity } = candidate;

    let path_lower = chunk.file_path.to_lowercase();
    let content_lower = chunk.content.to_lowercase();
    let path_match = token_fraction(tokens, |t| path_lower.contains(t));
    let content_match = token_fraction(tokens, |t| content_lower.contains(t));
    let symbol_match = symbol_signal(&chunk, tokens);
    let type_boost = file_type_boost(chunk.extension());

    let signals = Signals {
        similarity,
        path_match,
        content_match,
        symbol_match,
        file_type_boost: type_boost,
    };
    let score = (WEIGHT_SIMILARITY * similarity
        + WEIGHT_PATH * path_match
        + WEIGHT_CONTENT * content_match
        + WEIGHT_SYMBOL * symbol_match
        + WEIGHT_FILE_TYPE * type_boost)
        .clamp(0.0, 1.0);

    RankedChunk {
        chunk,
        signals,
        score,
    }
}

#[allow(clippy::cast_precision_loss)]
fn token_fraction(tokens: &[String], mut hit: impl FnMut(&str) -> bool) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let hits = tokens.iter().filter(|t| hit(t)).count();
    hits as f32 / tokens.len() as f32
}

/// 1.0 when any query token exactly equals a symbol name; otherwise the
/// fraction of query tokens that substring-match any symbol name.
#[allow(clippy::cast_precision_loss)]
fn symbol_signal(chunk: &crate::core::Chunk, tokens: &[String]) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let names: Vec<String> = symbols::extract(&chunk.content, &chunk.file_path, chunk.start_line)
        .into_iter()
        .map(|s| s.name.to_lowercase())
        .collect();
    if names.is_empty() {
        return 0.0;
    }
    if tokens.iter().any(|t| names.iter().any(|n| n == t)) {
        return 1.0;
    }
    let hits = tokens
        .iter()
        .filter(|t| names.iter().any(|n| n.contains(t.as_str())))
        .count();
    hits as f32 / tokens.len() as f32
}

fn apply_import_boost(ranked: &mut [RankedChunk], graph: &ImportGraph) {
    let seeds: Vec<&str> = ranked
        .iter()
        .take(IMPORT_BOOST_TOP_N)
        .map(|r| r.chunk.file_path.as_str())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let boosted = graph.imported_within(&seeds, IMPORT_BOOST_DEPTH);
    for entry in ranked.iter_mut() {
        if boosted.contains(&entry.chunk.file_path) {
            entry.score = (entry.score + IMPORT_BOOST).min(1.0);
        }
    }
}

fn sort_ranked(ranked: &mut [RankedChunk]) {
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.signals.similarity.total_cmp(&a.signals.similarity))
            .then_with(|| a.chunk.file_path.cmp(&b.chunk.file_path))
            .then_with(|| a.chunk.start_line.cmp(&b.chunk.start_line))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Chunk, ChunkKind};

    fn candidate(path: &str, content: &str, similarity: f32) -> Candidate {
        Candidate {
            chunk: Chunk::new(
                "app",
                path,
                content.to_string(),
                1,
                1,
                4,
                ChunkKind::TokenBlock,
            ),
            similarity,
        }
    }

    #[test]
    fn test_query_tokens_filtering() {
        let tokens = query_tokens("How does the auth middleware work?");
        assert_eq!(tokens, vec!["auth", "middleware"]);
    }

    #[test]
    fn test_query_tokens_dedupe_and_length() {
        let tokens = query_tokens("db db io a an");
        assert!(tokens.is_empty(), "short tokens dropped: {tokens:?}");
    }

    #[test]
    fn test_file_type_ordering() {
        assert!(file_type_boost("ts") > file_type_boost("md"));
        assert!(file_type_boost("md") > file_type_boost("yaml"));
        assert!(file_type_boost("yaml") > file_type_boost("json"));
        assert!(file_type_boost("json") > file_type_boost("bin"));
    }

    #[test]
    fn test_score_weights_sum() {
        let total =
            WEIGHT_SIMILARITY + WEIGHT_PATH + WEIGHT_CONTENT + WEIGHT_SYMBOL + WEIGHT_FILE_TYPE;
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_path_match_beats_plain_similarity() {
        let ranked = rank(
            vec![
                candidate("src/billing.ts", "unrelated content entirely", 0.5),
                candidate("src/auth.ts", "unrelated content entirely", 0.5),
            ],
            "auth session",
            None,
        );
        assert_eq!(ranked[0].chunk.file_path, "src/auth.ts");
        assert!(ranked[0].signals.path_match > 0.0);
    }

    #[test]
    fn test_symbol_exact_match_is_full_signal() {
        let ranked = rank(
            vec![candidate(
                "a.ts",
                "export function login() { return true; }",
                0.1,
            )],
            "login flow",
            None,
        );
        assert!((ranked[0].signals.symbol_match - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scores_bounded() {
        let ranked = rank(
            vec![candidate(
                "src/auth/login.ts",
                "export function login() {} // login login auth",
                1.0,
            )],
            "login auth",
            None,
        );
        assert!(ranked[0].score <= 1.0);
        assert!(ranked[0].score > 0.5);
    }

    #[test]
    fn test_deterministic_tie_break() {
        let ranked = rank(
            vec![
                candidate("b.ts", "same text here", 0.4),
                candidate("a.ts", "same text here", 0.4),
            ],
            "nothing matches",
            None,
        );
        assert_eq!(ranked[0].chunk.file_path, "a.ts");
    }

    #[test]
    fn test_import_boost_lifts_dependencies() {
        let graph = ImportGraph::build(&[
            (
                "top.ts".to_string(),
                "import { helper } from './dep';".to_string(),
            ),
            ("dep.ts".to_string(), "export const x = 1;".to_string()),
        ]);
        let without = rank(
            vec![
                candidate("top.ts", "matching query words", 0.9),
                candidate("dep.ts", "nothing in common", 0.2),
            ],
            "matching query words",
            None,
        );
        let with = rank(
            vec![
                candidate("top.ts", "matching query words", 0.9),
                candidate("dep.ts", "nothing in common", 0.2),
            ],
            "matching query words",
            Some(&graph),
        );
        let score_without = without
            .iter()
            .find(|r| r.chunk.file_path == "dep.ts")
            .map(|r| r.score)
            .unwrap();
        let score_with = with
            .iter()
            .find(|r| r.chunk.file_path == "dep.ts")
            .map(|r| r.score)
            .unwrap();
        assert!((score_with - score_without - IMPORT_BOOST).abs() < 1e-6);
    }
}
