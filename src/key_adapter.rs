//! Key-binding adapter: keeps the low-level key subscription in sync with the resolved map.
//!
//! Reconciliation runs on every scope or focus change, but most of those leave the resolved
//! map structurally unchanged. The adapter compares the incoming map against what it last
//! installed and only touches the `KeySource` when a combo, its owning scope, or its event
//! flags actually changed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::binding::{DispatchOutcome, KeyEvent, ResolvedHotkey};
use crate::combo::normalize_combo;
use crate::config::{HotkeyConfig, DEFAULT_PREVENT_DEFAULT, DEFAULT_STOP_PROPAGATION};
use crate::error::{HotkeyError, Result};
use crate::listeners::panic_message;
use crate::logging;
use crate::scope::ResolvedHotkeys;

// ============================================================================
// Key sources
// ============================================================================

/// Low-level key event subscription, e.g. a window-level keydown hook.
///
/// The adapter installs at most one subscription at a time, covering every combo it
/// currently listens for.
pub trait KeySource {
    fn install(&mut self, combos: &[String]) -> anyhow::Result<()>;
    fn uninstall(&mut self);
}

/// Key source that accepts every subscription and never delivers anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedKeySource;

impl KeySource for DetachedKeySource {
    fn install(&mut self, _combos: &[String]) -> anyhow::Result<()> {
        Ok(())
    }

    fn uninstall(&mut self) {}
}

#[derive(Debug, Default)]
struct RecordingState {
    installed: Option<Vec<String>>,
    installs: usize,
    uninstalls: usize,
    fail_next: bool,
}

/// In-memory key source that records subscriptions. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct RecordingKeySource {
    state: Rc<RefCell<RecordingState>>,
}

impl RecordingKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combos of the live subscription, sorted.
    pub fn installed(&self) -> Option<Vec<String>> {
        self.state.borrow().installed.clone()
    }

    pub fn install_count(&self) -> usize {
        self.state.borrow().installs
    }

    pub fn uninstall_count(&self) -> usize {
        self.state.borrow().uninstalls
    }

    /// Make the next `install` call fail.
    pub fn fail_next_install(&self) {
        self.state.borrow_mut().fail_next = true;
    }
}

impl KeySource for RecordingKeySource {
    fn install(&mut self, combos: &[String]) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        if std::mem::take(&mut state.fail_next) {
            anyhow::bail!("subscription refused");
        }
        let mut combos = combos.to_vec();
        combos.sort();
        state.installed = Some(combos);
        state.installs += 1;
        Ok(())
    }

    fn uninstall(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.installed.take().is_some() {
            state.uninstalls += 1;
        }
    }
}

// ============================================================================
// Adapter
// ============================================================================

pub struct KeyBindingAdapter {
    source: Box<dyn KeySource>,
    /// Last map handed to `update_bindings`, remembered even while disabled.
    current: ResolvedHotkeys,
    /// Normalized combo → combo as registered.
    table: HashMap<String, String>,
    installed: bool,
    enabled: bool,
    prevent_default: bool,
    stop_propagation: bool,
    rebuild_count: usize,
}

impl Default for KeyBindingAdapter {
    fn default() -> Self {
        Self::new(Box::new(DetachedKeySource))
    }
}

impl KeyBindingAdapter {
    pub fn new(source: Box<dyn KeySource>) -> Self {
        Self {
            source,
            current: ResolvedHotkeys::new(),
            table: HashMap::new(),
            installed: false,
            enabled: true,
            prevent_default: DEFAULT_PREVENT_DEFAULT,
            stop_propagation: DEFAULT_STOP_PROPAGATION,
            rebuild_count: 0,
        }
    }

    /// Replace the active bindings. Returns true if the subscription was rebuilt.
    pub fn update_bindings(&mut self, resolved: &ResolvedHotkeys) -> Result<bool> {
        if !self.enabled {
            self.current = resolved.clone();
            return Ok(false);
        }

        if bindings_equal(&self.current, resolved) {
            // Subscription unchanged; still pick up replaced handlers
            self.current = resolved.clone();
            return Ok(false);
        }

        self.current = resolved.clone();
        self.rebuild_or_forget()?;
        Ok(true)
    }

    /// Rebuild; on failure forget the map so the next reconciliation retries the install.
    fn rebuild_or_forget(&mut self) -> Result<()> {
        let result = self.rebuild();
        if result.is_err() {
            self.current.clear();
            self.table.clear();
        }
        result
    }

    fn rebuild(&mut self) -> Result<()> {
        self.teardown_subscription();

        self.table = self
            .current
            .iter()
            .filter(|(_, hotkey)| !hotkey.disabled)
            .map(|(combo, _)| (normalize_combo(combo), combo.clone()))
            .collect();
        self.rebuild_count += 1;

        if self.table.is_empty() {
            return Ok(());
        }

        let combos: Vec<String> = self.table.keys().cloned().collect();
        self.source
            .install(&combos)
            .map_err(|e| HotkeyError::KeySource(format!("{e:#}")))?;
        self.installed = true;

        tracing::debug!(
            category = "KEYS",
            combos = combos.len(),
            "Installed key subscription"
        );
        Ok(())
    }

    fn teardown_subscription(&mut self) {
        if self.installed {
            self.source.uninstall();
            self.installed = false;
        }
    }

    /// Offer a key event. Applies event flags and calls `invoke` for a matched combo.
    pub fn dispatch(
        &self,
        event: &mut KeyEvent,
        invoke: impl FnOnce(&ResolvedHotkey, &mut KeyEvent) -> DispatchOutcome,
    ) -> DispatchOutcome {
        if !self.enabled || !self.installed {
            return DispatchOutcome::Unmatched;
        }

        let Some(hotkey) = self
            .table
            .get(&normalize_combo(event.combo()))
            .and_then(|combo| self.current.get(combo))
        else {
            return DispatchOutcome::Unmatched;
        };

        if hotkey.prevent_default.unwrap_or(self.prevent_default) {
            event.prevent_default();
        }
        if hotkey.stop_propagation.unwrap_or(self.stop_propagation) {
            event.stop_propagation();
        }

        match catch_unwind(AssertUnwindSafe(|| invoke(hotkey, event))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                logging::log_handler_error(&hotkey.combo, &hotkey.scope_id, &panic_message(&panic));
                DispatchOutcome::Failed
            }
        }
    }

    /// Pick up event-flag defaults and the enabled switch.
    pub fn update_config(&mut self, config: &HotkeyConfig) -> Result<()> {
        self.prevent_default = config.prevent_default;
        self.stop_propagation = config.stop_propagation;
        match (config.enabled, self.enabled) {
            (true, false) => self.enable(),
            (false, true) => {
                self.disable();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Re-enable and install the remembered bindings.
    pub fn enable(&mut self) -> Result<()> {
        self.enabled = true;
        self.rebuild_or_forget()
    }

    /// Uninstall the subscription but keep the remembered bindings.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.teardown_subscription();
    }

    /// Uninstall and forget everything.
    pub fn destroy(&mut self) {
        self.teardown_subscription();
        self.current.clear();
        self.table.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Normalized combos the subscription listens for, sorted.
    pub fn subscribed_combos(&self) -> Vec<String> {
        let mut combos: Vec<String> = self.table.keys().cloned().collect();
        combos.sort();
        combos
    }

    pub fn current_bindings(&self) -> &ResolvedHotkeys {
        &self.current
    }

    /// How many times the subscription table has been rebuilt.
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }
}

/// Same size and, per combo, the same subscription-relevant fields.
pub fn bindings_equal(current: &ResolvedHotkeys, incoming: &ResolvedHotkeys) -> bool {
    current.len() == incoming.len()
        && incoming.iter().all(|(combo, hotkey)| {
            current
                .get(combo)
                .is_some_and(|existing| existing.same_subscription(hotkey))
        })
}

#[cfg(test)]
#[path = "key_adapter_tests.rs"]
mod tests;
