//! Source and file records.
//!
//! A source is a registered root directory within a project; files are the
//! discovered, content-hashed entries underneath it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A registered source root.
///
/// Created by explicit registration, mutated only by re-index, never
/// implicitly removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Stable id, unique per project.
    pub id: String,

    /// Absolute root path of the source.
    pub root: PathBuf,

    /// Include globs, applied first. Empty means everything.
    #[serde(default)]
    pub include: Vec<String>,

    /// Exclude globs, subtracted after the includes.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Unix timestamp of the last completed index run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<i64>,
}

impl Source {
    /// Creates a source with no glob filters.
    #[must_use]
    pub fn new(id: &str, root: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            root,
            include: Vec::new(),
            exclude: Vec::new(),
            indexed_at: None,
        }
    }

    /// Sets the include globs.
    #[must_use]
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    /// Sets the exclude globs.
    #[must_use]
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }
}

/// A file row in the store: one per discovered file per source.
///
/// Removed when the file disappears from disk at the next index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Owning source id.
    pub source_id: String,

    /// Path relative to the source root, unique within the source.
    pub relative_path: String,

    /// Hex digest of the raw file bytes.
    pub content_hash: String,

    /// Unix timestamp when this file was last indexed.
    pub indexed_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_builder() {
        let source = Source::new("app", PathBuf::from("/work/app"))
            .with_include(vec!["src/**/*.ts".to_string()])
            .with_exclude(vec!["**/*.test.ts".to_string()]);
        assert_eq!(source.id, "app");
        assert_eq!(source.include.len(), 1);
        assert_eq!(source.exclude.len(), 1);
        assert!(source.indexed_at.is_none());
    }

    #[test]
    fn test_source_yaml_roundtrip() {
        let source = Source::new("app", PathBuf::from("/work/app"));
        let yaml = serde_yaml::to_string(&source).unwrap();
        let back: Source = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, source);
    }
}
