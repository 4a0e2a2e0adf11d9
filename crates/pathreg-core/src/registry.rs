//! The public registry: gate, then file lock, then store.

use crate::config::RegistrySettings;
use crate::error::{FailureKind, RegistryError, Result};
use crate::gate::Gate;
use crate::lock::{self, FileLock, OnTimeout};
use crate::outcome::{Outcome, Recovery};
use crate::store::UuidStore;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Remembers where the file carrying each UUID was last seen.
///
/// `register` and `lookup` never fail: the registry is a convenience cache
/// over files that can always be rescanned, so a failed write is logged and
/// dropped and a failed read looks like a miss. The `*_outcome` variants
/// expose what actually happened.
pub struct Registry {
    settings: RegistrySettings,
    store: UuidStore,
    gate: Arc<Gate>,
}

impl Registry {
    /// Create a registry with its own gate.
    pub fn new(settings: RegistrySettings) -> Self {
        Self::with_gate(settings, Arc::new(Gate::new()))
    }

    /// Create a registry sharing `gate` with other registries of this
    /// process.
    pub fn with_gate(settings: RegistrySettings, gate: Arc<Gate>) -> Self {
        let store = UuidStore::new(&settings);
        Self {
            settings,
            store,
            gate,
        }
    }

    /// Create a registry at the platform default location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(RegistrySettings::platform_default()?))
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Record `path` as the location of `uuid`, replacing any earlier path.
    pub fn register(&self, uuid: &str, path: impl AsRef<Path>) {
        self.register_logged(uuid, path.as_ref());
    }

    /// `register`, reporting whether the entry was stored.
    pub(crate) fn register_logged(&self, uuid: &str, path: &Path) -> bool {
        debug!("register({}, {})", uuid, path.display());
        let outcome = self.register_outcome(uuid, path);
        log_outcome("register", &format!("{}, {}", uuid, path.display()), &outcome);
        !outcome.is_degraded()
    }

    /// Get the last registered path for `uuid`.
    ///
    /// `None` both when the uuid was never registered and when the lookup
    /// failed.
    pub fn lookup(&self, uuid: &str) -> Option<PathBuf> {
        debug!("lookup({})", uuid);
        let outcome = self.lookup_outcome(uuid);
        log_outcome("lookup", uuid, &outcome);
        outcome.into_value().flatten()
    }

    /// Paths that are not valid UTF-8 are rejected rather than stored in a
    /// lossy form that would name a different file.
    pub fn register_outcome(&self, uuid: &str, path: &Path) -> Outcome<()> {
        let Some(value) = path.to_str() else {
            let err = RegistryError::NonUtf8Path(path.to_path_buf());
            return Outcome::from_parts(Err(err), Vec::new());
        };
        self.run(|store| store.put(uuid, value))
    }

    pub fn lookup_outcome(&self, uuid: &str) -> Outcome<Option<PathBuf>> {
        self.run(|store| Ok(store.get(uuid)?.map(|entry| PathBuf::from(entry.path))))
    }

    /// Gate, lock with stale-lock recovery, store access with wipe recovery.
    ///
    /// The gate guard and file lock are released on every exit, including
    /// unwinding out of `access`.
    fn run<T>(&self, mut access: impl FnMut(&UuidStore) -> Result<T>) -> Outcome<T> {
        let _gate = self.gate.acquire();
        let mut recoveries = Vec::new();
        let result = self.under_lock(&mut recoveries, |recoveries| {
            self.with_store_recovery(recoveries, &mut access)
        });
        Outcome::from_parts(result, recoveries)
    }

    fn under_lock<T>(
        &self,
        recoveries: &mut Vec<Recovery>,
        mut critical: impl FnMut(&mut Vec<Recovery>) -> Result<T>,
    ) -> Result<T> {
        let lock_path = self.settings.lock_path();
        let mut last_timeout = None;

        for attempt in lock::lock_plan(&self.settings) {
            match FileLock::acquire(&lock_path, attempt.timeout, self.settings.poll_interval) {
                Ok(held) => {
                    let result = critical(recoveries);
                    if let Err(e) = held.release() {
                        warn!("{}", e);
                    }
                    return result;
                }
                Err(e) if e.kind() == FailureKind::LockTimeout => match attempt.on_timeout {
                    OnTimeout::ClearStaleLock => {
                        info!("{}; clearing it as stale", e);
                        lock::clear_stale_lock(&lock_path)?;
                        recoveries.push(Recovery::ClearedStaleLock {
                            path: lock_path.clone(),
                        });
                        last_timeout = Some(e);
                    }
                    OnTimeout::GiveUp => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }

        Err(last_timeout.unwrap_or_else(|| {
            RegistryError::Other(format!("No lock attempts made for {}", lock_path.display()))
        }))
    }

    fn with_store_recovery<T>(
        &self,
        recoveries: &mut Vec<Recovery>,
        access: &mut impl FnMut(&UuidStore) -> Result<T>,
    ) -> Result<T> {
        match access(&self.store) {
            Err(e) if e.kind() == FailureKind::StoreOpen => {
                warn!("{}; wiping store and retrying", e);
                let removed = self.store.wipe();
                recoveries.push(Recovery::WipedStore { removed });
                access(&self.store)
            }
            other => other,
        }
    }
}

fn log_outcome<T: Debug>(op: &str, context: &str, outcome: &Outcome<T>) {
    match outcome {
        Outcome::Success(_) => {}
        Outcome::Recovered { recoveries, .. } => {
            info!("{}({}) succeeded after recovery: {:?}", op, context, recoveries)
        }
        Outcome::Degraded { error, recoveries } if recoveries.is_empty() => {
            error!("{}({}) failed: {}", op, context, error)
        }
        Outcome::Degraded { error, recoveries } => error!(
            "{}({}) failed after recovery {:?}: {}",
            op, context, recoveries, error
        ),
    }
}
