//! Error types for the path registry.
//!
//! Every failure inside the registry is classified into one of three kinds.
//! Two of them drive a recovery step before the operation gives up.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for registry internals.
///
/// None of these escape the public `register`/`lookup`/`scan_directory`
/// calls; they surface through [`crate::Outcome`] and the log.
#[derive(Debug, Error)]
pub enum RegistryError {
    // Locking errors
    #[error("Timed out after {timeout:?} waiting for lock {path:?}")]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("Lock error at {path:?}: {message}")]
    Lock {
        message: String,
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    // Store errors
    #[error("Failed to open store {path:?}: {message}")]
    StoreOpen {
        message: String,
        path: PathBuf,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Path is not valid UTF-8: {0:?}")]
    NonUtf8Path(PathBuf),

    // Profile errors
    #[error("Failed to read profile {path:?}: {message}")]
    Profile { path: PathBuf, message: String },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Coarse classification of a [`RegistryError`].
///
/// Only the first two kinds have a recovery procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The lock was not obtained in time; the lock file is presumed stale.
    LockTimeout,
    /// The store could not be opened; its files are presumed corrupt.
    StoreOpen,
    /// Anything else. Logged, never recovered.
    Other,
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        RegistryError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl RegistryError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        RegistryError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a store-open error for the database at `path`.
    pub fn store_open(err: rusqlite::Error, path: impl Into<PathBuf>) -> Self {
        RegistryError::StoreOpen {
            message: err.to_string(),
            path: path.into(),
            source: Some(err),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            RegistryError::LockTimeout { .. } => FailureKind::LockTimeout,
            RegistryError::StoreOpen { .. } => FailureKind::StoreOpen,
            _ => FailureKind::Other,
        }
    }

    /// Check if this error has a recovery procedure.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), FailureKind::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::LockTimeout {
            path: PathBuf::from("/tmp/uuid_cache.lock"),
            timeout: Duration::from_millis(500),
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 500ms waiting for lock \"/tmp/uuid_cache.lock\""
        );
    }

    #[test]
    fn test_failure_kinds() {
        let timeout = RegistryError::LockTimeout {
            path: PathBuf::from("x.lock"),
            timeout: Duration::from_millis(1),
        };
        assert_eq!(timeout.kind(), FailureKind::LockTimeout);

        let open = RegistryError::StoreOpen {
            message: "file is not a database".into(),
            path: PathBuf::from("x.db"),
            source: None,
        };
        assert_eq!(open.kind(), FailureKind::StoreOpen);

        let io: RegistryError = std::io::Error::other("boom").into();
        assert_eq!(io.kind(), FailureKind::Other);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(RegistryError::LockTimeout {
            path: PathBuf::from("x.lock"),
            timeout: Duration::ZERO,
        }
        .is_recoverable());
        assert!(!RegistryError::Other("nope".into()).is_recoverable());
        assert!(!RegistryError::NotADirectory(PathBuf::from("/a")).is_recoverable());
    }
}
