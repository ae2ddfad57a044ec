//! Output formatting for selections.
//!
//! Four render targets: markdown (default), xml, json, plain. Files appear
//! in order of first appearance in the ranked set; chunks within a file
//! are sorted by start line. The markdown rendering carries no timing and
//! is byte-deterministic for a fixed store and query.

use crate::select::{RankedChunk, Selection};
use serde::Serialize;
use std::fmt::Write;

/// Output format for a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Markdown with fenced code blocks.
    #[default]
    Markdown,
    /// XML with CDATA-wrapped chunk bodies.
    Xml,
    /// A `SelectionData` JSON object.
    Json,
    /// Bare code with `//` location headers.
    Plain,
}

impl OutputFormat {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Plain => "plain",
        }
    }

    /// Parses a format name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidUsage`] for unknown names.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            "plain" | "text" => Ok(Self::Plain),
            other => Err(crate::Error::InvalidUsage {
                message: format!(
                    "unknown format {other:?} (expected markdown, xml, json or plain)"
                ),
            }),
        }
    }
}

/// The JSON shape of a selection.
#[derive(Debug, Serialize)]
pub struct SelectionData {
    /// The query as given.
    pub query: String,
    /// Markdown body of the selection (files and fenced chunks).
    pub context: String,
    /// Compact per-chunk records.
    pub chunks: Vec<ChunkData>,
    /// Selection statistics.
    pub stats: StatsData,
}

/// One chunk in [`SelectionData`].
#[derive(Debug, Serialize)]
pub struct ChunkData {
    /// File path relative to its source root.
    pub file: String,
    /// `[start, end]`, 1-indexed inclusive.
    pub lines: [usize; 2],
    /// Token count.
    pub tokens: usize,
    /// Composite score.
    pub score: f32,
}

/// Statistics in [`SelectionData`].
#[derive(Debug, Serialize)]
pub struct StatsData {
    /// Total tokens in the selection.
    pub total_tokens: usize,
    /// Candidates considered before fitting.
    pub chunks_considered: usize,
    /// Chunks included after fitting and merging.
    pub chunks_included: usize,
    /// Distinct files included.
    pub files_included: usize,
    /// Wall time of the selection in milliseconds.
    pub time_ms: u64,
}

/// Renders a selection in the requested format.
///
/// `explain` appends a scoring breakdown and only applies to markdown.
#[must_use]
pub fn render(selection: &Selection, format: OutputFormat, explain: bool) -> String {
    match format {
        OutputFormat::Markdown => render_markdown(selection, explain),
        OutputFormat::Xml => render_xml(selection),
        OutputFormat::Json => render_json(selection),
        OutputFormat::Plain => render_plain(selection),
    }
}

/// Chunks grouped by file in order of first appearance in the ranked set,
/// sorted by start line within each file.
fn grouped_chunks(selection: &Selection) -> Vec<(&str, Vec<&RankedChunk>)> {
    let mut groups: Vec<(&str, Vec<&RankedChunk>)> = Vec::new();
    for entry in &selection.chunks {
        let path = entry.chunk.file_path.as_str();
        match groups.iter_mut().find(|(p, _)| *p == path) {
            Some((_, list)) => list.push(entry),
            None => groups.push((path, vec![entry])),
        }
    }
    for (_, list) in &mut groups {
        list.sort_by_key(|r| r.chunk.start_line);
    }
    groups
}

/// Markdown body: `## path (lines S-E)` headers and fenced code blocks,
/// no stats line.
fn markdown_body(selection: &Selection) -> String {
    let mut out = String::new();
    for (path, chunks) in grouped_chunks(selection) {
        let hint = language_hint(path);
        for entry in chunks {
            let _ = writeln!(
                out,
                "## {path} (lines {}-{})",
                entry.chunk.start_line, entry.chunk.end_line
            );
            let _ = writeln!(out, "```{hint}");
            out.push_str(&entry.chunk.content);
            out.push('\n');
            out.push_str("```\n\n");
        }
    }
    out
}

fn render_markdown(selection: &Selection, explain: bool) -> String {
    let mut out = markdown_body(selection);
    let _ = writeln!(
        out,
        "> {} tokens | {} chunks | {} files",
        selection.total_tokens,
        selection.chunks.len(),
        selection.files_included()
    );

    if explain {
        out.push_str("\n## Scoring Details\n\n");
        for entry in &selection.chunks {
            let s = &entry.signals;
            let _ = writeln!(
                out,
                "- `{}:{}-{}` — similarity {}, path {}, content {}, symbols {}, file type {} → **{}**",
                entry.chunk.file_path,
                entry.chunk.start_line,
                entry.chunk.end_line,
                percent(s.similarity),
                percent(s.path_match),
                percent(s.content_match),
                percent(s.symbol_match),
                percent(s.file_type_boost),
                percent(entry.score),
            );
        }
    }
    out
}

fn render_xml(selection: &Selection) -> String {
    let mut out = String::new();
    out.push_str("<context>\n");
    let _ = writeln!(out, "  <query>{}</query>", xml_escape(&selection.query));
    out.push_str("  <files>\n");
    for (path, chunks) in grouped_chunks(selection) {
        let _ = writeln!(out, "    <file path=\"{}\">", xml_escape(path));
        for entry in chunks {
            let _ = writeln!(
                out,
                "      <chunk lines=\"{}-{}\" tokens=\"{}\"><![CDATA[{}]]></chunk>",
                entry.chunk.start_line,
                entry.chunk.end_line,
                entry.chunk.tokens,
                cdata_escape(&entry.chunk.content),
            );
        }
        out.push_str("    </file>\n");
    }
    out.push_str("  </files>\n");
    let _ = writeln!(
        out,
        "  <stats total-tokens=\"{}\" chunks=\"{}\" files=\"{}\"/>",
        selection.total_tokens,
        selection.chunks.len(),
        selection.files_included()
    );
    out.push_str("</context>\n");
    out
}

fn render_json(selection: &Selection) -> String {
    let data = SelectionData {
        query: selection.query.clone(),
        context: markdown_body(selection),
        chunks: selection
            .chunks
            .iter()
            .map(|entry| ChunkData {
                file: entry.chunk.file_path.clone(),
                lines: [entry.chunk.start_line, entry.chunk.end_line],
                tokens: entry.chunk.tokens,
                score: entry.score,
            })
            .collect(),
        stats: StatsData {
            total_tokens: selection.total_tokens,
            chunks_considered: selection.chunks_considered,
            chunks_included: selection.chunks.len(),
            files_included: selection.files_included(),
            time_ms: selection.time_ms,
        },
    };
    serde_json::to_string_pretty(&data).unwrap_or_else(|_| "{}".to_string())
}

fn render_plain(selection: &Selection) -> String {
    let mut out = String::new();
    for (path, chunks) in grouped_chunks(selection) {
        for entry in chunks {
            let _ = writeln!(
                out,
                "// {path} (lines {}-{})",
                entry.chunk.start_line, entry.chunk.end_line
            );
            out.push_str(&entry.chunk.content);
            out.push_str("\n\n");
        }
    }
    out
}

fn percent(value: f32) -> String {
    format!("{:.0}%", f64::from(value) * 100.0)
}

/// Fence language hint from a file extension.
#[must_use]
pub fn language_hint(path: &str) -> &'static str {
    match path.rsplit_once('.').map_or("", |(_, ext)| ext) {
        "ts" => "typescript",
        "tsx" => "tsx",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "py" => "python",
        "go" => "go",
        "rs" => "rust",
        "md" | "markdown" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "sh" | "bash" => "bash",
        "sql" => "sql",
        "html" => "html",
        "css" => "css",
        _ => "",
    }
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A CDATA section cannot contain `]]>`; split it across sections.
fn cdata_escape(text: &str) -> String {
    text.replace("]]>", "]]]]><![CDATA[>")
}
