//! Centralized configuration for the path registry.
//!
//! Constants live in the `*Config` tables; the values a host may override at
//! runtime live in [`RegistrySettings`] and [`ScanSettings`].

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Store and lock configuration.
pub struct RegistryConfig;

impl RegistryConfig {
    pub const APP_CONFIG_DIR_NAME: &'static str = "pathreg";
    pub const STORE_BASE_NAME: &'static str = "uuid_cache";
    pub const DB_SUFFIX: &'static str = ".db";
    pub const LOCK_SUFFIX: &'static str = ".lock";

    /// SQLite sidecar suffixes, appended to the database file name.
    pub const DB_SIDECAR_SUFFIXES: [&'static str; 3] = ["-wal", "-shm", "-journal"];

    // Lock timing
    pub const LOCK_TIMEOUT: Duration = Duration::from_millis(500);
    pub const RETRY_LOCK_TIMEOUT: Duration = Duration::from_millis(300);
    pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);

    pub const BUSY_TIMEOUT_MS: u32 = 250;
}

/// Profile scanning configuration.
pub struct ScanConfig;

impl ScanConfig {
    pub const PROFILE_EXTENSION: &'static str = "alog";
    pub const UUID_KEY: &'static str = "roastUUID";
}

/// Which files are removed when the store fails to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreCleanup {
    /// Only the database file and its SQLite sidecars.
    #[default]
    KnownFiles,
    /// Every file next to the store whose name starts with the base name,
    /// except the lock file.
    Prefix,
}

/// Runtime settings for a [`crate::Registry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegistrySettings {
    /// Base path shared by the store and its lock file.
    pub store_base: PathBuf,
    /// Timeout for the first lock attempt.
    pub lock_timeout: Duration,
    /// Timeout for the attempt made after clearing a stale lock.
    pub retry_lock_timeout: Duration,
    /// Sleep between non-blocking lock attempts.
    pub poll_interval: Duration,
    #[serde(default)]
    pub cleanup: StoreCleanup,
}

impl RegistrySettings {
    /// Settings for a store rooted at `store_base` with default timings.
    pub fn new(store_base: impl Into<PathBuf>) -> Self {
        Self {
            store_base: store_base.into(),
            lock_timeout: RegistryConfig::LOCK_TIMEOUT,
            retry_lock_timeout: RegistryConfig::RETRY_LOCK_TIMEOUT,
            poll_interval: RegistryConfig::LOCK_POLL_INTERVAL,
            cleanup: StoreCleanup::default(),
        }
    }

    /// Settings for the store at the platform config directory.
    pub fn platform_default() -> crate::Result<Self> {
        Ok(Self::new(crate::platform::default_store_base()?))
    }

    pub fn with_lock_timeouts(mut self, first: Duration, retry: Duration) -> Self {
        self.lock_timeout = first;
        self.retry_lock_timeout = retry;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_cleanup(mut self, cleanup: StoreCleanup) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// `<base>.db`
    pub fn db_path(&self) -> PathBuf {
        append_suffix(&self.store_base, RegistryConfig::DB_SUFFIX)
    }

    /// `<base>.lock`
    pub fn lock_path(&self) -> PathBuf {
        append_suffix(&self.store_base, RegistryConfig::LOCK_SUFFIX)
    }
}

/// Settings for [`crate::Registry::scan_directory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScanSettings {
    /// Profile file extension, without the leading dot.
    pub extension: String,
    /// Key under which a deserialized profile carries its UUID.
    pub uuid_key: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            extension: ScanConfig::PROFILE_EXTENSION.to_string(),
            uuid_key: ScanConfig::UUID_KEY.to_string(),
        }
    }
}

/// Append `suffix` to the final component of `path`.
///
/// Unlike `Path::with_extension` this never replaces an existing extension,
/// so a base of `cache.v2` yields `cache.v2.db`.
pub(crate) fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
