//! Hotkey Scopes - scope-based keyboard shortcut resolution
//!
//! This library decides which keyboard shortcut handler runs for a key combo, given the
//! set of active scopes and where focus currently sits in the host's UI tree.
//!
//! - `manager` - `HotkeyManager`, the registry and reconciliation loop
//! - `scope` - scope definitions and the pure `ScopeResolver`
//! - `focus` - `FocusTracker` and the host tree seams
//! - `key_adapter` - `KeyBindingAdapter`, the bridge to the low-level key source
//! - `engine` - `HotkeyEngine`, manager and tracker wired together
//! - `scenario` - JSON scenarios for headless runs

pub mod binding;
pub mod combo;
pub mod config;
pub mod engine;
pub mod error;
pub mod focus;
pub mod key_adapter;
pub mod listeners;
pub mod logging;
pub mod manager;
pub mod scenario;
pub mod scope;

pub use binding::{DispatchOutcome, HotkeyBinding, HotkeyHandler, KeyEvent, ResolvedHotkey};
pub use config::{HotkeyConfig, HotkeyConfigPatch};
pub use engine::HotkeyEngine;
pub use error::{HotkeyError, Result};
pub use focus::{FocusContext, FocusTracker};
pub use key_adapter::KeyBindingAdapter;
pub use manager::HotkeyManager;
pub use scope::{MergeStrategy, ScopeDefinition, ScopeResolver, GLOBAL_SCOPE};
