//! Platform-specific path utilities.

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use std::path::PathBuf;

/// Get the registry configuration directory.
///
/// This is the well-known location for state shared by every process that
/// uses the registry.
///
/// # Platform Behavior
/// - **Linux**: `~/.config/pathreg` (XDG_CONFIG_HOME)
/// - **Windows**: `%APPDATA%\pathreg`
/// - **macOS**: `~/Library/Application Support/pathreg`
pub fn registry_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| RegistryError::Config {
        message: "Could not determine platform config directory".to_string(),
    })?;
    Ok(config_dir.join(RegistryConfig::APP_CONFIG_DIR_NAME))
}

/// Get the default store base path.
///
/// Returns `{registry_config_dir}/uuid_cache`; the database and lock file
/// append their own suffixes.
pub fn default_store_base() -> Result<PathBuf> {
    Ok(registry_config_dir()?.join(RegistryConfig::STORE_BASE_NAME))
}
