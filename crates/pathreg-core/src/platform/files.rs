//! File identity helpers.

use std::fs::File;
use std::path::Path;

/// Check whether `path` currently names the same file as the open `file`.
///
/// Returns `false` when `path` no longer exists.
///
/// # Platform Behavior
/// - **Unix**: compares device and inode numbers
/// - **Other**: only checks that `path` still exists; unlinking an open
///   file is refused by the OS there, so existence is sufficient
#[cfg(unix)]
pub fn same_file(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let (Ok(open), Ok(named)) = (file.metadata(), std::fs::metadata(path)) else {
        return false;
    };
    open.dev() == named.dev() && open.ino() == named.ino()
}

#[cfg(not(unix))]
pub fn same_file(file: &File, path: &Path) -> bool {
    file.metadata().is_ok() && path.exists()
}

/// Delete the lock file at `path` while `file` still holds its lock.
///
/// # Platform Behavior
/// - **Unix**: unlinks first, then closes, so no waiter can lock a file that
///   is about to disappear
/// - **Windows**: an open file cannot be deleted, so the handle is closed
///   first
#[cfg(unix)]
pub fn remove_held_file(file: File, path: &Path) -> std::io::Result<()> {
    let result = std::fs::remove_file(path);
    drop(file);
    result
}

#[cfg(not(unix))]
pub fn remove_held_file(file: File, path: &Path) -> std::io::Result<()> {
    drop(file);
    std::fs::remove_file(path)
}
