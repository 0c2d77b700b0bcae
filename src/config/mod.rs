//! Configuration module - engine settings
//!
//! This module provides functionality for:
//! - Loading configuration from ~/.config/hotkey-scopes/config.json
//! - Default values for all settings
//! - Partial updates applied at runtime via `HotkeyManager::update_config`
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - `HotkeyConfig` and `HotkeyConfigPatch`
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{
    DEFAULT_DEBOUNCE_DELAY_MS, DEFAULT_MAX_SCOPE_DEPTH, DEFAULT_PREVENT_DEFAULT,
    DEFAULT_STOP_PROPAGATION,
};

pub use types::{HotkeyConfig, HotkeyConfigPatch};

pub use loader::{default_config_path, load_config, load_config_from};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
