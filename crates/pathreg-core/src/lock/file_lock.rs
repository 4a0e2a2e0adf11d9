//! RAII handle for the store's lock file.

use crate::error::{RegistryError, Result};
use crate::platform;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// An exclusive advisory lock on a lock file.
///
/// When dropped, the lock file is deleted and the lock released. If deletion
/// fails a warning is logged; the OS lock is released regardless.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    file: Option<File>,
}

impl FileLock {
    /// Acquire the lock at `path`, polling every `poll_interval` for at most
    /// `timeout`.
    ///
    /// Creates the lock file (and its parent directory) if needed.
    ///
    /// # Returns
    ///
    /// * `Ok(FileLock)` - Lock held until the handle is dropped or released
    /// * `Err(RegistryError::LockTimeout)` - Still contended after `timeout`
    /// * `Err(RegistryError::Lock)` - The lock file could not be opened or locked
    pub fn acquire(path: &Path, timeout: Duration, poll_interval: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| RegistryError::io_with_path(e, parent))?;
            }
        }

        let deadline = Instant::now() + timeout;
        loop {
            let file = open_lock_file(path)?;
            wait_for_lock(&file, path, timeout, deadline, poll_interval)?;

            if platform::same_file(&file, path) {
                debug!("Acquired lock {}", path.display());
                return Ok(Self {
                    path: path.to_path_buf(),
                    file: Some(file),
                });
            }

            // Locked a file that was deleted or replaced while we waited.
            debug!("Lock file {} was replaced, reopening", path.display());
        }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and delete the lock file, reporting failures.
    pub fn release(mut self) -> Result<()> {
        match self.file.take() {
            Some(file) => release_file(file, &self.path).map_err(|e| RegistryError::Lock {
                message: format!("Failed to remove lock file: {}", e),
                path: self.path.clone(),
                source: Some(e),
            }),
            None => Ok(()),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = release_file(file, &self.path) {
                warn!("Failed to release lock '{}': {}", self.path.display(), e);
            }
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| RegistryError::Lock {
            message: format!("Failed to open lock file: {}", e),
            path: path.to_path_buf(),
            source: Some(e),
        })
}

fn wait_for_lock(
    file: &File,
    path: &Path,
    timeout: Duration,
    deadline: Instant,
    poll_interval: Duration,
) -> Result<()> {
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(e) if is_contended(&e) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(RegistryError::LockTimeout {
                        path: path.to_path_buf(),
                        timeout,
                    });
                }
                thread::sleep(poll_interval.min(deadline - now));
            }
            Err(e) => {
                return Err(RegistryError::Lock {
                    message: format!("Failed to lock: {}", e),
                    path: path.to_path_buf(),
                    source: Some(e),
                })
            }
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Delete the lock file if it is still ours, then let the OS lock go.
fn release_file(file: File, path: &Path) -> io::Result<()> {
    if platform::same_file(&file, path) {
        platform::remove_held_file(file, path)?;
        debug!("Released lock {}", path.display());
    } else {
        // Someone cleared our lock as stale; the file now belongs to them.
        warn!(
            "Lock file {} no longer ours at release, leaving it in place",
            path.display()
        );
    }
    Ok(())
}
