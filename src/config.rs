//! Project configuration.
//!
//! `.contextkit/config.yaml` holds the registered sources and a settings
//! record. Every setting has an explicit default so a hand-trimmed file
//! stays loadable.

use crate::chunking::{ChunkOptions, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::core::Source;
use crate::discovery::{DEFAULT_MAX_FILE_SIZE, DiscoveryOptions};
use crate::error::{Error, Result};
use crate::index::{
    DEFAULT_EMBED_BATCH_SIZE, DEFAULT_EMBED_CONCURRENCY, DEFAULT_EMBED_RETRIES, IndexOptions,
};
use crate::select::{DEFAULT_BUDGET, DEFAULT_CANDIDATE_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A registered source as written to the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source name, unique per project.
    pub name: String,
    /// Absolute root path.
    pub path: PathBuf,
    /// Include globs (empty = everything).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Exclude globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl SourceConfig {
    /// View as a core [`Source`].
    #[must_use]
    pub fn to_source(&self) -> Source {
        Source::new(&self.name, self.path.clone())
            .with_include(self.include.clone())
            .with_exclude(self.exclude.clone())
    }
}

/// Tunable settings with explicit defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Target chunk size in tokens.
    pub chunk_size: usize,
    /// Token-block overlap in tokens.
    pub chunk_overlap: usize,
    /// Whether to attempt syntax-aware chunking.
    pub use_ast: bool,
    /// Per-file byte cap during discovery.
    pub max_file_size: u64,
    /// Texts per embedding call.
    pub embed_batch_size: usize,
    /// Retry attempts per failed embedding batch.
    pub embed_retries: u32,
    /// Embedding batches in flight at once.
    pub embed_concurrency: usize,
    /// Retriever candidate limit.
    pub candidate_limit: usize,
    /// Default token budget for select.
    pub default_budget: usize,
    /// Default output format name.
    pub default_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            use_ast: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            embed_retries: DEFAULT_EMBED_RETRIES,
            embed_concurrency: DEFAULT_EMBED_CONCURRENCY,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            default_budget: DEFAULT_BUDGET,
            default_format: "markdown".to_string(),
        }
    }
}

impl Settings {
    /// Chunking options derived from these settings.
    #[must_use]
    pub fn chunk_options(&self) -> ChunkOptions {
        ChunkOptions {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            use_ast: self.use_ast,
        }
    }

    /// Index options derived from these settings.
    #[must_use]
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            chunk: self.chunk_options(),
            discovery: DiscoveryOptions {
                max_file_size: self.max_file_size,
            },
            embed_batch_size: self.embed_batch_size,
            embed_retries: self.embed_retries,
            embed_concurrency: self.embed_concurrency,
        }
    }
}

/// The on-disk configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Config format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Registered sources.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Tunable settings.
    #[serde(default)]
    pub settings: Settings,
}

const fn default_version() -> u32 {
    1
}

impl ConfigFile {
    /// A fresh default config with no sources.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: 1,
            sources: Vec::new(),
            settings: Settings::default(),
        }
    }

    /// Loads and parses the config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unreadable or malformed YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    /// Serializes and writes the config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_yaml::to_string(self)?;
        std::fs::write(path, raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Finds a source by name.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}
