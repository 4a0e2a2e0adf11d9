//! Cross-process advisory lock guarding the store.
//!
//! # Lock File
//!
//! The lock lives next to the store at `<base>.lock` and carries no data.
//! It is locked with an exclusive `fs2` advisory lock, polled until a
//! timeout elapses because the OS offers no timed variant.
//!
//! # Stale Locks
//!
//! A holder that dies releases its OS lock, but a holder that hangs keeps
//! it forever. A timed-out acquisition is therefore treated as stale: the
//! lock file is deleted and acquisition retried once on a fresh file, with
//! a shorter timeout. See [`lock_plan`].
//!
//! # Replaced Lock Files
//!
//! Deleting a lock file other processes may be waiting on is only safe
//! because every holder checks, after locking, that the path still names the
//! file it locked, and re-opens otherwise. Release removes the file only
//! while it is still the holder's own.

mod file_lock;
mod plan;

pub use file_lock::FileLock;
pub use plan::{lock_plan, LockAttempt, OnTimeout};

use crate::error::{RegistryError, Result};
use std::path::Path;
use tracing::info;

/// Remove a lock file presumed stale.
///
/// Returns `false` if there was nothing to remove.
pub fn clear_stale_lock(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Removed stale lock {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(RegistryError::Lock {
            message: format!("Failed to remove stale lock: {}", e),
            path: path.to_path_buf(),
            source: Some(e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clear_stale_lock_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("uuid_cache.lock");
        std::fs::write(&path, b"").unwrap();

        assert!(clear_stale_lock(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_clear_stale_lock_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("uuid_cache.lock");

        assert!(!clear_stale_lock(&path).unwrap());
    }

    #[test]
    fn test_clear_stale_lock_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("uuid_cache.lock");
        std::fs::create_dir(&path).unwrap();

        let err = clear_stale_lock(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Lock { .. }));
    }
}
