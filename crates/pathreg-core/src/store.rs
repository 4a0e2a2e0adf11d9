//! SQLite-backed uuid -> path store.
//!
//! The store opens a fresh connection per operation and closes it before
//! returning. It does no locking of its own: callers must hold the
//! registry's gate and file lock.

use crate::config::{append_suffix, RegistryConfig, RegistrySettings, StoreCleanup};
use crate::error::{RegistryError, Result};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A stored registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub uuid: String,
    pub path: String,
    /// RFC 3339 time of the last write.
    pub updated_at: String,
}

/// On-disk store of registrations.
#[derive(Debug, Clone)]
pub struct UuidStore {
    store_base: PathBuf,
    db_path: PathBuf,
    lock_path: PathBuf,
    cleanup: StoreCleanup,
}

impl UuidStore {
    pub fn new(settings: &RegistrySettings) -> Self {
        Self {
            store_base: settings.store_base.clone(),
            db_path: settings.db_path(),
            lock_path: settings.lock_path(),
            cleanup: settings.cleanup,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Insert or overwrite the path for `uuid`.
    ///
    /// The write is committed with `synchronous=FULL`, so it is on stable
    /// storage when this returns.
    pub fn put(&self, uuid: &str, path: &str) -> Result<()> {
        let conn = self.open()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO uuid_paths (uuid, path, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(uuid) DO UPDATE SET
                 path=excluded.path,
                 updated_at=excluded.updated_at",
            params![uuid, path, now],
        )
        .map_err(|e| self.access_error(e))?;
        close(conn)?;

        debug!("Stored {} -> {}", uuid, path);
        Ok(())
    }

    /// Get the entry for `uuid`.
    ///
    /// A store that was never written is not created here.
    pub fn get(&self, uuid: &str) -> Result<Option<Entry>> {
        if !self.db_path.exists() {
            return Ok(None);
        }

        let conn = self.open()?;
        let entry = conn
            .query_row(
                "SELECT uuid, path, updated_at FROM uuid_paths WHERE uuid = ?1",
                params![uuid],
                |row| {
                    Ok(Entry {
                        uuid: row.get(0)?,
                        path: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| self.access_error(e))?;
        close(conn)?;

        Ok(entry)
    }

    /// Files removed by [`UuidStore::wipe`] under the configured cleanup
    /// scope. Only existing files are listed.
    pub fn files(&self) -> Vec<PathBuf> {
        match self.cleanup {
            StoreCleanup::KnownFiles => {
                let mut files = vec![self.db_path.clone()];
                files.extend(
                    RegistryConfig::DB_SIDECAR_SUFFIXES
                        .iter()
                        .map(|suffix| append_suffix(&self.db_path, suffix)),
                );
                files.retain(|path| path.is_file());
                files
            }
            StoreCleanup::Prefix => self.prefix_files(),
        }
    }

    /// Delete every store file. Returns how many were removed.
    ///
    /// Failures are logged; the caller's retry decides whether the store
    /// is usable afterwards.
    pub fn wipe(&self) -> usize {
        info!("Cleaning store files for {}", self.store_base.display());

        let mut removed = 0;
        for path in self.files() {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed store file {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove store file {}: {}", path.display(), e),
            }
        }
        removed
    }

    /// Open the database, creating it and its schema if needed.
    ///
    /// Every failure here is a [`RegistryError::StoreOpen`], including a
    /// table left behind by an incompatible version.
    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| RegistryError::Io {
                    message: format!("Failed to create store directory: {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(&self.db_path)
            .map_err(|e| RegistryError::store_open(e, &self.db_path))?;

        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\n\
             PRAGMA synchronous=FULL;\n\
             PRAGMA busy_timeout={};",
            RegistryConfig::BUSY_TIMEOUT_MS,
        ))
        .map_err(|e| RegistryError::store_open(e, &self.db_path))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS uuid_paths (
                uuid TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .map_err(|e| RegistryError::store_open(e, &self.db_path))?;

        conn.prepare("SELECT uuid, path, updated_at FROM uuid_paths LIMIT 0")
            .map(drop)
            .map_err(|e| RegistryError::store_open(e, &self.db_path))?;

        Ok(conn)
    }

    /// Classify an error from a statement on an open connection.
    ///
    /// Damaged pages past the header only show up once a statement touches
    /// them. Those count as a store that no longer opens.
    fn access_error(&self, err: rusqlite::Error) -> RegistryError {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) => {
                RegistryError::store_open(err, &self.db_path)
            }
            _ => err.into(),
        }
    }

    /// Regular files beside the store whose names start with the base name.
    fn prefix_files(&self) -> Vec<PathBuf> {
        let Some(prefix) = self.store_base.file_name().and_then(|n| n.to_str()) else {
            return Vec::new();
        };
        let dir = match self.store_base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list store directory {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
            .map(|entry| entry.path())
            .filter(|path| path.file_name() != self.lock_path.file_name())
            .collect();
        files.sort();
        files
    }
}

fn close(conn: Connection) -> Result<()> {
    conn.close().map_err(|(_, e)| RegistryError::Database {
        message: format!("Failed to close store: {}", e),
        source: Some(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use tempfile::TempDir;

    fn create_test_store(cleanup: StoreCleanup) -> (UuidStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let settings =
            RegistrySettings::new(temp_dir.path().join("uuid_cache")).with_cleanup(cleanup);
        (UuidStore::new(&settings), temp_dir)
    }

    fn corrupt(path: &Path) {
        fs::write(path, vec![b'x'; 4096]).unwrap();
    }

    /// Overwrite one 4 KiB page (1-based) of a database file.
    fn clobber_page(path: &Path, page: u64) {
        use std::io::{Seek, SeekFrom, Write};

        let mut file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.seek(SeekFrom::Start((page - 1) * 4096)).unwrap();
        file.write_all(&[0xAB; 4096]).unwrap();
        file.sync_all().unwrap();
    }

    #[test]
    fn test_put_then_get() {
        let (store, _temp_dir) = create_test_store(StoreCleanup::KnownFiles);

        store.put("u1", "/a/1.alog").unwrap();

        let entry = store.get("u1").unwrap().unwrap();
        assert_eq!(entry.uuid, "u1");
        assert_eq!(entry.path, "/a/1.alog");
        assert!(!entry.updated_at.is_empty());
    }

    #[test]
    fn test_put_overwrites() {
        let (store, _temp_dir) = create_test_store(StoreCleanup::KnownFiles);

        store.put("u1", "/a/1.alog").unwrap();
        store.put("u1", "/b/2.alog").unwrap();

        assert_eq!(store.get("u1").unwrap().unwrap().path, "/b/2.alog");
    }

    #[test]
    fn test_get_missing_key() {
        let (store, _temp_dir) = create_test_store(StoreCleanup::KnownFiles);
        store.put("u1", "/a/1.alog").unwrap();

        assert!(store.get("u2").unwrap().is_none());
    }

    #[test]
    fn test_get_does_not_create_store() {
        let (store, _temp_dir) = create_test_store(StoreCleanup::KnownFiles);

        assert!(store.get("u1").unwrap().is_none());
        assert!(!store.db_path().exists());
    }

    #[test]
    fn test_put_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let settings = RegistrySettings::new(temp_dir.path().join("deep/er/uuid_cache"));
        let store = UuidStore::new(&settings);

        store.put("u1", "/a/1.alog").unwrap();
        assert!(store.db_path().exists());
    }

    #[test]
    fn test_garbage_file_is_store_open_failure() {
        let (store, _temp_dir) = create_test_store(StoreCleanup::KnownFiles);
        corrupt(store.db_path());

        let err = store.put("u1", "/a/1.alog").unwrap_err();
        assert_eq!(err.kind(), FailureKind::StoreOpen);

        let err = store.get("u1").unwrap_err();
        assert_eq!(err.kind(), FailureKind::StoreOpen);
    }

    #[test]
    fn test_incompatible_schema_is_store_open_failure() {
        let (store, _temp_dir) = create_test_store(StoreCleanup::KnownFiles);
        {
            let conn = Connection::open(store.db_path()).unwrap();
            conn.execute_batch("CREATE TABLE uuid_paths (id INTEGER PRIMARY KEY, blob BLOB);")
                .unwrap();
        }

        let err = store.put("u1", "/a/1.alog").unwrap_err();
        assert_eq!(err.kind(), FailureKind::StoreOpen);
    }

    #[test]
    fn test_damaged_table_page_is_store_open_failure() {
        let (store, _temp_dir) = create_test_store(StoreCleanup::KnownFiles);
        for i in 0..50 {
            store.put(&format!("u{}", i), &format!("/a/{}.alog", i)).unwrap();
        }
        clobber_page(store.db_path(), 2);

        let err = store.put("new", "/a/new.alog").unwrap_err();
        assert_eq!(err.kind(), FailureKind::StoreOpen);

        let err = store.get("u1").unwrap_err();
        assert_eq!(err.kind(), FailureKind::StoreOpen);
    }

    #[test]
    fn test_wipe_known_files_spares_neighbours() {
        let (store, temp_dir) = create_test_store(StoreCleanup::KnownFiles);
        corrupt(store.db_path());
        let wal = append_suffix(store.db_path(), "-wal");
        fs::write(&wal, b"junk").unwrap();
        let neighbour = temp_dir.path().join("uuid_cache.db.org");
        fs::write(&neighbour, b"keep").unwrap();

        assert_eq!(store.wipe(), 2);
        assert!(!store.db_path().exists());
        assert!(!wal.exists());
        assert!(neighbour.exists());

        store.put("u1", "/a/1.alog").unwrap();
        assert_eq!(store.get("u1").unwrap().unwrap().path, "/a/1.alog");
    }

    #[test]
    fn test_wipe_prefix_removes_all_but_lock() {
        let (store, temp_dir) = create_test_store(StoreCleanup::Prefix);
        corrupt(store.db_path());
        let neighbour = temp_dir.path().join("uuid_cache.db.org");
        fs::write(&neighbour, b"goes too").unwrap();
        let lock = temp_dir.path().join("uuid_cache.lock");
        fs::write(&lock, b"").unwrap();
        let unrelated = temp_dir.path().join("profiles.json");
        fs::write(&unrelated, b"{}").unwrap();

        assert_eq!(store.wipe(), 2);
        assert!(!store.db_path().exists());
        assert!(!neighbour.exists());
        assert!(lock.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_wipe_empty_directory() {
        let (store, _temp_dir) = create_test_store(StoreCleanup::Prefix);
        assert_eq!(store.wipe(), 0);
        assert!(store.files().is_empty());
    }
}
