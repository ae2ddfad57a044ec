//! File discovery.
//!
//! Walks a source root, applies include globs then exclude globs, skips
//! binary and oversized files, and yields content-hashed files in
//! deterministic (lexicographic) order.

use crate::core::Source;
use crate::error::{Error, Result};
use crate::io;
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default per-file byte cap (1 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Discovery options.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Files larger than this many bytes are reported but not yielded.
    pub max_file_size: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// A file yielded by discovery, content in memory and already hashed.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Owning source id.
    pub source_id: String,
    /// Path relative to the source root, with `/` separators.
    pub relative_path: String,
    /// Absolute path on disk.
    pub absolute_path: PathBuf,
    /// Full UTF-8 content.
    pub content: String,
    /// Hex sha256 of the raw file bytes.
    pub content_hash: String,
}

/// Why a file was skipped rather than yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// NUL byte in the first 8 KB.
    Binary,
    /// Larger than the configured byte cap.
    Oversize,
    /// Could not be read.
    Unreadable,
    /// Not valid UTF-8.
    NotUtf8,
}

/// A skipped file and the reason.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    /// Path relative to the source root.
    pub relative_path: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Result of walking one source.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Yielded files, sorted lexicographically by relative path.
    pub files: Vec<DiscoveredFile>,
    /// Files seen but not yielded.
    pub skipped: Vec<SkippedFile>,
}

/// Walks `source.root` and returns its files.
///
/// Include globs are applied first (empty means everything), then exclude
/// globs are subtracted. Individual unreadable files are skipped with a
/// warning; a missing source root is fatal.
///
/// # Errors
///
/// Returns [`Error::PathNotFound`] if the root does not exist, or
/// [`Error::InvalidUsage`] for a malformed glob.
pub fn discover(source: &Source, options: &DiscoveryOptions) -> Result<DiscoveryReport> {
    if !source.root.is_dir() {
        return Err(Error::PathNotFound {
            path: source.root.display().to_string(),
            suggestion: sibling_suggestion(&source.root),
        });
    }

    let mut builder = OverrideBuilder::new(&source.root);
    for glob in &source.include {
        builder.add(glob).map_err(|e| Error::InvalidUsage {
            message: format!("bad include glob {glob:?}: {e}"),
        })?;
    }
    for glob in &source.exclude {
        builder
            .add(&format!("!{glob}"))
            .map_err(|e| Error::InvalidUsage {
                message: format!("bad exclude glob {glob:?}: {e}"),
            })?;
    }
    let overrides = builder.build().map_err(|e| Error::InvalidUsage {
        message: format!("bad glob set: {e}"),
    })?;

    let walker = WalkBuilder::new(&source.root)
        .standard_filters(true)
        .overrides(overrides)
        .build();

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in walker {
        let Ok(entry) = entry else { continue };
        if entry.file_type().is_some_and(|ft| ft.is_file()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    let mut report = DiscoveryReport::default();
    for absolute_path in paths {
        let relative_path = relative_str(&source.root, &absolute_path);

        let size = match std::fs::metadata(&absolute_path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %relative_path, error = %e, "skipping unreadable file");
                report.skipped.push(SkippedFile {
                    relative_path,
                    reason: SkipReason::Unreadable,
                });
                continue;
            }
        };
        if size > options.max_file_size {
            report.skipped.push(SkippedFile {
                relative_path,
                reason: SkipReason::Oversize,
            });
            continue;
        }

        let bytes = match io::read_bytes(&absolute_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %relative_path, error = %e, "skipping unreadable file");
                report.skipped.push(SkippedFile {
                    relative_path,
                    reason: SkipReason::Unreadable,
                });
                continue;
            }
        };
        if io::is_binary(&bytes) {
            report.skipped.push(SkippedFile {
                relative_path,
                reason: SkipReason::Binary,
            });
            continue;
        }

        let content_hash = hash_bytes(&bytes);
        let Ok(content) = String::from_utf8(bytes) else {
            warn!(path = %relative_path, "skipping non-UTF-8 file");
            report.skipped.push(SkippedFile {
                relative_path,
                reason: SkipReason::NotUtf8,
            });
            continue;
        };

        report.files.push(DiscoveredFile {
            source_id: source.id.clone(),
            relative_path,
            absolute_path,
            content,
            content_hash,
        });
    }

    Ok(report)
}

/// Hex sha256 digest of raw bytes.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Renders `path` relative to `root` with forward slashes.
fn relative_str(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let s = rel.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Looks for a sibling directory with a similar name, for the
/// `PathNotFound` hint.
pub(crate) fn sibling_suggestion(missing: &Path) -> Option<String> {
    let parent = missing.parent()?;
    let target = missing.file_name()?.to_string_lossy().to_lowercase();
    let entries = std::fs::read_dir(parent).ok()?;
    let mut best: Option<String> = None;
    for entry in entries.flatten() {
        if !entry.file_type().is_ok_and(|ft| ft.is_dir()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let lower = name.to_lowercase();
        if lower.starts_with(&target) || target.starts_with(&lower) {
            let candidate = parent.join(&name).display().to_string();
            if best.as_ref().is_none_or(|b| candidate < *b) {
                best = Some(candidate);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)]) -> (TempDir, Source) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let source = Source::new("test", dir.path().to_path_buf());
        (dir, source)
    }

    #[test]
    fn test_discover_sorted_order() {
        let (_dir, source) = setup(&[
            ("src/zeta.ts", "z"),
            ("src/alpha.ts", "a"),
            ("main.ts", "m"),
        ]);
        let report = discover(&source, &DiscoveryOptions::default()).unwrap();
        let paths: Vec<&str> = report.files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["main.ts", "src/alpha.ts", "src/zeta.ts"]);
    }

    #[test]
    fn test_discover_include_globs() {
        let (_dir, mut source) = setup(&[("a.ts", "a"), ("b.js", "b"), ("c.md", "c")]);
        source.include = vec!["*.ts".to_string()];
        let report = discover(&source, &DiscoveryOptions::default()).unwrap();
        let paths: Vec<&str> = report.files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a.ts"]);
    }

    #[test]
    fn test_discover_exclude_globs() {
        let (_dir, mut source) = setup(&[("a.ts", "a"), ("a.test.ts", "t"), ("b.ts", "b")]);
        source.exclude = vec!["*.test.ts".to_string()];
        let report = discover(&source, &DiscoveryOptions::default()).unwrap();
        let paths: Vec<&str> = report.files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a.ts", "b.ts"]);
    }

    #[test]
    fn test_discover_skips_binary() {
        let (dir, source) = setup(&[("code.ts", "ok")]);
        fs::write(dir.path().join("blob.bin"), b"\x00\x01\x02binary").unwrap();
        let report = discover(&source, &DiscoveryOptions::default()).unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::Binary);
    }

    #[test]
    fn test_discover_skips_oversize() {
        let (_dir, source) = setup(&[("big.ts", "0123456789"), ("small.ts", "ok")]);
        let options = DiscoveryOptions { max_file_size: 5 };
        let report = discover(&source, &options).unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].relative_path, "small.ts");
        assert_eq!(report.skipped[0].reason, SkipReason::Oversize);
    }

    #[test]
    fn test_discover_missing_root_fatal() {
        let source = Source::new("gone", PathBuf::from("/definitely/not/here"));
        let err = discover(&source, &DiscoveryOptions::default()).unwrap_err();
        assert!(matches!(err, Error::PathNotFound { .. }));
    }

    #[test]
    fn test_content_hash_is_stable_hex() {
        let (_dir, source) = setup(&[("a.ts", "const x = 1;")]);
        let report = discover(&source, &DiscoveryOptions::default()).unwrap();
        let hash = &report.files[0].content_hash;
        assert_eq!(hash.len(), 64);
        assert_eq!(*hash, hash_bytes(b"const x = 1;"));
    }

    #[test]
    fn test_sibling_suggestion() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("backend")).unwrap();
        let missing = dir.path().join("backen");
        let suggestion = sibling_suggestion(&missing);
        assert!(suggestion.is_some_and(|s| s.ends_with("backend")));
    }
}
