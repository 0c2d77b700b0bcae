//! Configuration loading from file system
//!
//! Handles loading and parsing the JSON config file.

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use super::types::HotkeyConfig;
use crate::error::{HotkeyError, Result};

/// Default config location (~/.config/hotkey-scopes/config.json on Linux)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Load configuration from the default location.
///
/// Returns `HotkeyConfig::default()` if the file is missing or unreadable.
#[instrument(name = "load_config")]
pub fn load_config() -> HotkeyConfig {
    let config_path = default_config_path();

    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        return HotkeyConfig::default();
    }

    match load_config_from(&config_path) {
        Ok(config) => {
            info!(path = %config_path.display(), "Successfully loaded config");
            config
        }
        Err(e) => {
            warn!(error = %e, path = %config_path.display(), "Failed to load config, using defaults");
            HotkeyConfig::default()
        }
    }
}

/// Load configuration from an explicit path. Missing fields take their defaults.
pub fn load_config_from(path: &Path) -> Result<HotkeyConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| HotkeyError::ConfigRead {
        path: path.display().to_string(),
        source,
    })?;
    let config = serde_json::from_str::<HotkeyConfig>(&contents)?;
    Ok(config)
}
