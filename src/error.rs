//! Error types for ContextKit operations.
//!
//! Every fallible operation in the crate returns [`Result`] with a tagged
//! [`Error`] variant; nothing is thrown. The CLI layer is the sole
//! translator from an `Error` to a process exit code.

use thiserror::Error;

/// Result type alias for ContextKit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for ContextKit operations.
///
/// Each variant carries a stable code string (see [`Error::code`]) and a
/// human message. Some variants carry a remediation hint printed under the
/// error line by the CLI.
#[derive(Error, Debug)]
pub enum Error {
    /// No `.contextkit/` directory in the project.
    #[error("not initialized: no .contextkit directory found")]
    NotInitialized,

    /// `init` on an already-initialized project without `--force`.
    #[error("already initialized: .contextkit exists at {path}")]
    AlreadyInitialized {
        /// Path of the existing project directory.
        path: String,
    },

    /// A registered source name was not found.
    #[error("source not found: {name}")]
    SourceNotFound {
        /// The unknown source name.
        name: String,
    },

    /// A filesystem path does not exist.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The missing path.
        path: String,
        /// A sibling directory that may have been meant.
        suggestion: Option<String>,
    },

    /// Registering a source under a name that is already taken.
    #[error("source already exists: {name}")]
    SourceExists {
        /// The conflicting source name.
        name: String,
    },

    /// Argument validation failure.
    #[error("invalid usage: {message}")]
    InvalidUsage {
        /// What was wrong with the arguments.
        message: String,
    },

    /// The project has no registered sources.
    #[error("no sources registered")]
    NoSources,

    /// The index contains no retrievable chunks.
    #[error("index is empty")]
    IndexEmpty,

    /// A query or command produced no results and the caller asked for
    /// that to be a failure.
    #[error("no results: {message}")]
    NoResults {
        /// What produced nothing.
        message: String,
    },

    /// Embedding generation failure.
    #[error("embedding error: {message}")]
    Embedding {
        /// What went wrong.
        message: String,
        /// Whether a retry may succeed.
        retriable: bool,
    },

    /// Database failure. Fatal for the current operation; the store stays
    /// readable because writes are transactional.
    #[error("database error: {0}")]
    Database(String),

    /// Anything the retriever or ranker cannot handle.
    #[error("query error: {0}")]
    Query(String),

    /// I/O failure outside the store.
    #[error("I/O error: {path}: {reason}")]
    Io {
        /// Path involved in the failure.
        path: String,
        /// Reason for the failure.
        reason: String,
    },

    /// Configuration file failure.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable code string for this error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized { .. } => "ALREADY_INITIALIZED",
            Self::SourceNotFound { .. } => "SOURCE_NOT_FOUND",
            Self::PathNotFound { .. } => "PATH_NOT_FOUND",
            Self::SourceExists { .. } => "SOURCE_EXISTS",
            Self::InvalidUsage { .. } => "INVALID_USAGE",
            Self::NoSources => "NO_SOURCES",
            Self::IndexEmpty => "INDEX_EMPTY",
            Self::NoResults { .. } => "NO_RESULTS",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Query(_) => "QUERY_ERROR",
            Self::Io { .. } => "IO_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Optional remediation hint printed under the error line.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("run: contextkit init".to_string()),
            Self::AlreadyInitialized { .. } => Some("pass --force to re-initialize".to_string()),
            Self::NoSources => Some("run: contextkit source add <path>".to_string()),
            Self::IndexEmpty => Some("run: contextkit index".to_string()),
            Self::Embedding { retriable, .. } if *retriable => {
                Some("transient embedding failure; re-run the command".to_string())
            }
            Self::PathNotFound { suggestion, .. } => {
                suggestion.as_ref().map(|s| format!("did you mean: {s}?"))
            }
            _ => None,
        }
    }

    /// Process exit code the CLI maps this error to.
    ///
    /// `0` success, `1` general failure, `2` usage error, `3` not
    /// initialized, `4` no results.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidUsage { .. } => 2,
            Self::NotInitialized => 3,
            Self::NoResults { .. } => 4,
            _ => 1,
        }
    }
}

// Conversions from library errors. Everything funnels into the tagged
// variants so callers only ever match on `Error`.

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: String::new(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Database(format!("serialization: {err}"))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::SourceNotFound {
            name: "backend".to_string(),
        };
        assert_eq!(err.to_string(), "source not found: backend");

        let err = Error::IndexEmpty;
        assert_eq!(err.to_string(), "index is empty");
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(Error::NotInitialized.code(), "NOT_INITIALIZED");
        assert_eq!(Error::NoSources.code(), "NO_SOURCES");
        assert_eq!(Error::Database("x".to_string()).code(), "DATABASE_ERROR");
        assert_eq!(
            Error::Embedding {
                message: "x".to_string(),
                retriable: true
            }
            .code(),
            "EMBEDDING_ERROR"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            Error::InvalidUsage {
                message: "bad".to_string()
            }
            .exit_code(),
            2
        );
        assert_eq!(Error::NotInitialized.exit_code(), 3);
        assert_eq!(
            Error::NoResults {
                message: "no symbols".to_string()
            }
            .exit_code(),
            4
        );
        assert_eq!(Error::IndexEmpty.exit_code(), 1);
        assert_eq!(Error::Database("boom".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_hints() {
        assert!(Error::NotInitialized.hint().is_some());
        assert!(Error::IndexEmpty.hint().is_some());
        assert!(Error::Database("x".to_string()).hint().is_none());

        let err = Error::PathNotFound {
            path: "./sr".to_string(),
            suggestion: Some("./src".to_string()),
        };
        assert_eq!(err.hint().as_deref(), Some("did you mean: ./src?"));

        let err = Error::Embedding {
            message: "timeout".to_string(),
            retriable: false,
        };
        assert!(err.hint().is_none());
    }

    #[test]
    fn test_error_from_rusqlite() {
        let err: Error = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<i32>("nope").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Database(_)));
    }
}
