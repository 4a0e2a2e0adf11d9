//! Directory scanning: find profile files and register the UUIDs they carry.
//!
//! Reading a profile is the host application's business. The scanner only
//! needs the [`ProfileSource`] capabilities: a default directory and a way
//! to turn a file into a key/value map.

use crate::config::ScanSettings;
use crate::error::{RegistryError, Result};
use crate::registry::Registry;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Host capabilities consumed by the scanner.
pub trait ProfileSource {
    /// Directory scanned when the caller names none.
    fn default_directory(&self) -> Result<PathBuf>;

    /// Read a profile file into its top-level fields.
    fn deserialize(&self, path: &Path) -> Result<Map<String, Value>>;
}

/// Profiles stored as JSON objects.
#[derive(Debug, Clone)]
pub struct JsonProfileSource {
    default_dir: PathBuf,
}

impl JsonProfileSource {
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
        }
    }
}

impl ProfileSource for JsonProfileSource {
    fn default_directory(&self) -> Result<PathBuf> {
        Ok(self.default_dir.clone())
    }

    fn deserialize(&self, path: &Path) -> Result<Map<String, Value>> {
        let contents =
            fs::read_to_string(path).map_err(|e| RegistryError::io_with_path(e, path))?;
        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            other => Err(RegistryError::Profile {
                path: path.to_path_buf(),
                message: format!("expected a JSON object, found {}", json_type(&other)),
            }),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Summary of a directory scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Files whose UUID was stored.
    pub registered: Vec<PathBuf>,
    /// Matching files without a usable UUID.
    pub skipped: Vec<PathBuf>,
    /// Matching files that could not be read or registered.
    pub failed: Vec<PathBuf>,
}

impl Registry {
    /// Register every profile in `dir` (or the source's default directory).
    ///
    /// Only the directory's own files are considered, not subdirectories.
    /// Symlinks are followed. Per-file failures are logged and skipped; a
    /// directory that cannot be read is logged and yields an empty report.
    pub fn scan_directory(
        &self,
        dir: Option<&Path>,
        source: &dyn ProfileSource,
        settings: &ScanSettings,
    ) -> ScanReport {
        debug!("scan_directory({:?})", dir);
        match self.try_scan_directory(dir, source, settings) {
            Ok(report) => {
                info!(
                    "Scan finished: {} registered, {} skipped, {} failed",
                    report.registered.len(),
                    report.skipped.len(),
                    report.failed.len()
                );
                report
            }
            Err(e) => {
                error!("scan_directory({:?}) failed: {}", dir, e);
                ScanReport::default()
            }
        }
    }

    fn try_scan_directory(
        &self,
        dir: Option<&Path>,
        source: &dyn ProfileSource,
        settings: &ScanSettings,
    ) -> Result<ScanReport> {
        let dir = match dir {
            Some(dir) => dir.to_path_buf(),
            None => source.default_directory()?,
        };
        let metadata = fs::metadata(&dir).map_err(|e| RegistryError::io_with_path(e, &dir))?;
        if !metadata.is_dir() {
            return Err(RegistryError::NotADirectory(dir));
        }

        let mut report = ScanReport::default();
        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    if let Some(path) = e.path() {
                        report.failed.push(path.to_path_buf());
                    }
                    continue;
                }
            };
            if !entry.file_type().is_file() || !has_extension(entry.path(), &settings.extension) {
                continue;
            }

            let path = entry.path();
            let fields = match source.deserialize(path) {
                Ok(fields) => fields,
                Err(e) => {
                    warn!("Skipping unreadable profile {}: {}", path.display(), e);
                    report.failed.push(path.to_path_buf());
                    continue;
                }
            };

            match fields.get(&settings.uuid_key) {
                Some(Value::String(uuid)) if !uuid.is_empty() => {
                    if self.register_logged(uuid, path) {
                        report.registered.push(path.to_path_buf());
                    } else {
                        report.failed.push(path.to_path_buf());
                    }
                }
                Some(other) => {
                    warn!(
                        "Profile {} has unusable {} value: {}",
                        path.display(),
                        settings.uuid_key,
                        other
                    );
                    report.skipped.push(path.to_path_buf());
                }
                None => {
                    debug!("Profile {} has no {}", path.display(), settings.uuid_key);
                    report.skipped.push(path.to_path_buf());
                }
            }
        }

        Ok(report)
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}
