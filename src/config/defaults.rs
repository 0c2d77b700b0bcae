//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Hotkey handling is on unless the host turns it off
pub const DEFAULT_ENABLED: bool = true;

/// Verbose engine logging
pub const DEFAULT_DEBUG_MODE: bool = false;

/// Default event handling applied to matched key events
pub const DEFAULT_PREVENT_DEFAULT: bool = true;
pub const DEFAULT_STOP_PROPAGATION: bool = false;

/// Deepest parent chain accepted by scope validation
pub const DEFAULT_MAX_SCOPE_DEPTH: usize = 6;

/// Focus recompute debounce in milliseconds (one frame at 60fps)
pub const DEFAULT_DEBOUNCE_DELAY_MS: u64 = 16;

/// Record focus history and navigation patterns
pub const DEFAULT_ENABLE_PREDICTION: bool = true;

/// Registering against an unknown scope is an error in debug builds only
pub const DEFAULT_STRICT_SCOPES: bool = cfg!(debug_assertions);

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "hotkey-scopes";
