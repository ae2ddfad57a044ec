//! Project layout.
//!
//! A ContextKit project is a directory containing `.contextkit/` with the
//! config file and the index database. Commands run against the current
//! working directory.

use crate::config::ConfigFile;
use crate::error::{Error, Result};
use crate::storage::{SqliteStore, Store};
use crate::token;
use std::path::{Path, PathBuf};

/// Name of the project directory.
pub const PROJECT_DIR: &str = ".contextkit";

/// Config file name inside the project directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Index database file name inside the project directory.
pub const DB_FILE: &str = "index.db";

/// Handle to an initialized (or initializable) project.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Initializes a project at `root`, creating `.contextkit/` with a
    /// default config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] when the directory exists and
    /// `force` is not set.
    pub fn init(root: &Path, force: bool) -> Result<Self> {
        let dir = root.join(PROJECT_DIR);
        if dir.exists() && !force {
            return Err(Error::AlreadyInitialized {
                path: dir.display().to_string(),
            });
        }
        if dir.exists() && force {
            std::fs::remove_dir_all(&dir).map_err(|e| Error::Io {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        std::fs::create_dir_all(&dir).map_err(|e| Error::Io {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let project = Self {
            root: root.to_path_buf(),
        };
        ConfigFile::new().save(&project.config_path())?;
        Ok(project)
    }

    /// Opens the project at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] when `.contextkit/` is missing.
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join(PROJECT_DIR);
        if !dir.is_dir() {
            return Err(Error::NotInitialized);
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Whether `root` holds an initialized project.
    #[must_use]
    pub fn exists(root: &Path) -> bool {
        root.join(PROJECT_DIR).is_dir()
    }

    /// The project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `.contextkit/` inside the root.
    #[must_use]
    pub fn dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Path of the config file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.dir().join(CONFIG_FILE)
    }

    /// Path of the index database.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.dir().join(DB_FILE)
    }

    /// Loads the config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unreadable or malformed YAML.
    pub fn load_config(&self) -> Result<ConfigFile> {
        ConfigFile::load(&self.config_path())
    }

    /// Saves the config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the write fails.
    pub fn save_config(&self, config: &ConfigFile) -> Result<()> {
        config.save(&self.config_path())
    }

    /// Opens the store, creating the schema on first use and pinning the
    /// token-counter fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the index was built with a different
    /// token counter, or a database error.
    pub fn open_store(&self) -> Result<SqliteStore> {
        let mut store = SqliteStore::open(self.db_path())?;
        store.init()?;
        match store.token_model()? {
            None => store.set_token_model(token::MODEL_FINGERPRINT)?,
            Some(model) if model == token::MODEL_FINGERPRINT => {}
            Some(model) => {
                return Err(Error::Config(format!(
                    "index was built with token counter {model:?}; \
                     delete {} and re-index",
                    self.db_path().display()
                )));
            }
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_layout() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path(), false).unwrap();
        assert!(project.dir().is_dir());
        assert!(project.config_path().is_file());
        assert!(Project::exists(dir.path()));
    }

    #[test]
    fn test_init_twice_requires_force() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path(), false).unwrap();
        let err = Project::init(dir.path(), false).unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized { .. }));
        Project::init(dir.path(), true).unwrap();
    }

    #[test]
    fn test_force_init_resets_config() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path(), false).unwrap();
        let mut config = project.load_config().unwrap();
        config.settings.chunk_size = 123;
        project.save_config(&config).unwrap();

        let project = Project::init(dir.path(), true).unwrap();
        let config = project.load_config().unwrap();
        assert_eq!(config.settings.chunk_size, 500);
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let dir = TempDir::new().unwrap();
        let err = Project::open(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
    }

    #[test]
    fn test_open_store_pins_token_model() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path(), false).unwrap();
        {
            let store = project.open_store().unwrap();
            assert_eq!(
                store.token_model().unwrap().as_deref(),
                Some(token::MODEL_FINGERPRINT)
            );
        }
        // Re-opening with the same fingerprint is fine.
        assert!(project.open_store().is_ok());
    }

    #[test]
    fn test_open_store_rejects_foreign_token_model() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path(), false).unwrap();
        {
            let mut store = project.open_store().unwrap();
            store.set_token_model("some-other-counter").unwrap();
        }
        let err = project.open_store().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
