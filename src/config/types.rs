//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::defaults::*;

// ============================================
// HOTKEY CONFIG
// ============================================

/// Engine-wide hotkey settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyConfig {
    /// Whether key events are dispatched at all (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Emit verbose engine logs (default: false)
    #[serde(default)]
    pub debug_mode: bool,
    /// Default for bindings that don't set `prevent_default` (default: true)
    #[serde(default = "default_prevent_default")]
    pub prevent_default: bool,
    /// Default for bindings that don't set `stop_propagation` (default: false)
    #[serde(default)]
    pub stop_propagation: bool,
    /// Deepest parent chain accepted by scope validation (default: 6)
    #[serde(default = "default_max_scope_depth")]
    pub max_scope_depth: usize,
    /// Focus recompute debounce in milliseconds (default: 16)
    #[serde(default = "default_debounce_delay")]
    pub debounce_delay: u64,
    /// Keep focus history and navigation patterns (default: true)
    #[serde(default = "default_enable_prediction")]
    pub enable_prediction: bool,
    /// Reject bindings that target unknown scopes (default: on in debug builds)
    #[serde(default = "default_strict_scopes")]
    pub strict_scopes: bool,
}

fn default_enabled() -> bool {
    DEFAULT_ENABLED
}
fn default_prevent_default() -> bool {
    DEFAULT_PREVENT_DEFAULT
}
fn default_max_scope_depth() -> usize {
    DEFAULT_MAX_SCOPE_DEPTH
}
fn default_debounce_delay() -> u64 {
    DEFAULT_DEBOUNCE_DELAY_MS
}
fn default_enable_prediction() -> bool {
    DEFAULT_ENABLE_PREDICTION
}
fn default_strict_scopes() -> bool {
    DEFAULT_STRICT_SCOPES
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        HotkeyConfig {
            enabled: DEFAULT_ENABLED,
            debug_mode: DEFAULT_DEBUG_MODE,
            prevent_default: DEFAULT_PREVENT_DEFAULT,
            stop_propagation: DEFAULT_STOP_PROPAGATION,
            max_scope_depth: DEFAULT_MAX_SCOPE_DEPTH,
            debounce_delay: DEFAULT_DEBOUNCE_DELAY_MS,
            enable_prediction: DEFAULT_ENABLE_PREDICTION,
            strict_scopes: DEFAULT_STRICT_SCOPES,
        }
    }
}

impl HotkeyConfig {
    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_delay)
    }

    /// Merge a partial update. Returns true if `enabled` changed.
    pub fn apply(&mut self, patch: &HotkeyConfigPatch) -> bool {
        let was_enabled = self.enabled;
        if let Some(v) = patch.enabled {
            self.enabled = v;
        }
        if let Some(v) = patch.debug_mode {
            self.debug_mode = v;
        }
        if let Some(v) = patch.prevent_default {
            self.prevent_default = v;
        }
        if let Some(v) = patch.stop_propagation {
            self.stop_propagation = v;
        }
        if let Some(v) = patch.max_scope_depth {
            self.max_scope_depth = v;
        }
        if let Some(v) = patch.debounce_delay {
            self.debounce_delay = v;
        }
        if let Some(v) = patch.enable_prediction {
            self.enable_prediction = v;
        }
        if let Some(v) = patch.strict_scopes {
            self.strict_scopes = v;
        }
        was_enabled != self.enabled
    }
}

// ============================================
// PARTIAL UPDATES
// ============================================

/// Partial configuration update; unset fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevent_default: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_propagation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scope_depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_prediction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_scopes: Option<bool>,
}

impl HotkeyConfigPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn debug_mode(debug_mode: bool) -> Self {
        Self {
            debug_mode: Some(debug_mode),
            ..Default::default()
        }
    }

    pub fn strict_scopes(strict: bool) -> Self {
        Self {
            strict_scopes: Some(strict),
            ..Default::default()
        }
    }
}
