//! Hotkey manager: registry, scope activation and reconciliation.
//!
//! The manager owns every binding and scope, decides which scopes are active, and recomputes
//! the resolved map whenever that state changes. The resolved map is pushed to the
//! key-binding adapter, which owns the low-level subscription.
//!
//! # Lifecycle
//!
//! 1. `HotkeyManager::new` seeds and activates the `global` scope
//! 2. Collaborators call `register_scope` and `register`
//! 3. The focus tracker reports contexts through the `FocusSink` impl
//! 4. The host forwards key events to `handle_key_event`

mod debug;
mod events;
mod focus_scope;

pub use debug::{DebugSummary, HotkeyDebugInfo, HotkeySummary, MetricsSummary, PerformanceMetrics};
pub use events::{HotkeyEvent, HotkeyEventKind};
pub use focus_scope::{FocusScopeHandle, FocusScopeOptions};

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Instant;

use crate::binding::{
    BindingId, DispatchOutcome, HotkeyBinding, HotkeyHandler, KeyEvent, LocalTask,
    ResolvedHotkey, TaskSpawner,
};
use crate::combo::normalize_combo;
use crate::config::{HotkeyConfig, HotkeyConfigPatch};
use crate::error::{HotkeyError, Result, ResultExt};
use crate::focus::{FocusContext, FocusSink};
use crate::key_adapter::{DetachedKeySource, KeyBindingAdapter, KeySource};
use crate::listeners::ListenerId;
use crate::logging;
use crate::scope::{
    ResolvedHotkeys, ScopeDefinition, ScopeResolver, ScopeState, ScopeStatePatch, GLOBAL_SCOPE,
};
use events::EventBus;

pub struct HotkeyManager {
    config: HotkeyConfig,
    registry: BTreeMap<BindingId, HotkeyBinding>,
    next_binding_id: u64,
    resolver: ScopeResolver,
    scope_states: HashMap<String, ScopeState>,
    /// Active scope ids in activation order.
    active_scopes: Vec<String>,
    resolved: ResolvedHotkeys,
    focus_context: Option<FocusContext>,
    adapter: KeyBindingAdapter,
    events: EventBus,
    spawner: Option<Rc<dyn TaskSpawner>>,
    metrics: PerformanceMetrics,
}

impl Default for HotkeyManager {
    fn default() -> Self {
        Self::new(HotkeyConfig::default())
    }
}

impl HotkeyManager {
    pub fn new(config: HotkeyConfig) -> Self {
        Self::with_key_source(config, Box::new(DetachedKeySource))
    }

    pub fn with_key_source(config: HotkeyConfig, source: Box<dyn KeySource>) -> Self {
        let mut adapter = KeyBindingAdapter::new(source);
        adapter.update_config(&config).log_err();

        let mut manager = Self {
            config,
            registry: BTreeMap::new(),
            next_binding_id: 0,
            resolver: ScopeResolver::new(),
            scope_states: HashMap::new(),
            active_scopes: Vec::new(),
            resolved: ResolvedHotkeys::new(),
            focus_context: None,
            adapter,
            events: EventBus::default(),
            spawner: None,
            metrics: PerformanceMetrics::default(),
        };

        manager.register_scope(GLOBAL_SCOPE, ScopeDefinition::global());
        manager.activate_scope(GLOBAL_SCOPE, None);
        manager
    }

    /// Executor used for deferred handlers. Without one, deferred handlers fail to dispatch.
    pub fn set_task_spawner(&mut self, spawner: Rc<dyn TaskSpawner>) {
        self.spawner = Some(spawner);
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Register a binding and return its id.
    ///
    /// A binding for a scope that isn't registered is rejected when `strict_scopes` is on;
    /// otherwise it stays inert in the registry until that scope is registered.
    pub fn register(&mut self, mut binding: HotkeyBinding) -> Result<BindingId> {
        if binding.combo.trim().is_empty() {
            return Err(HotkeyError::InvalidCombo {
                combo: binding.combo,
                reason: "combo is empty".to_string(),
            });
        }

        let scope_known = self.scope_states.contains_key(&binding.scope_id);
        if !scope_known && self.config.strict_scopes {
            return Err(HotkeyError::UnknownScope(binding.scope_id));
        }

        binding
            .prevent_default
            .get_or_insert(self.config.prevent_default);
        binding
            .stop_propagation
            .get_or_insert(self.config.stop_propagation);

        self.next_binding_id += 1;
        let id = BindingId(self.next_binding_id);
        self.registry.insert(id, binding.clone());

        let scope_id = binding.scope_id.clone();
        let combo = binding.combo.clone();
        match self.scope_states.get_mut(&scope_id) {
            Some(state) => state.attach(id, binding),
            None => tracing::warn!(
                category = "HOTKEY",
                scope_id = %scope_id,
                combo = %combo,
                "Binding targets an unregistered scope; it stays inert until the scope is registered"
            ),
        }

        if self.is_scope_active(&scope_id) {
            self.reconcile();
        }

        self.debug_log(&format!("Registered hotkey {} {} in {}", id, combo, scope_id));
        Ok(id)
    }

    /// Remove a binding. Returns false if the id is unknown.
    pub fn unregister(&mut self, id: BindingId) -> bool {
        let Some(binding) = self.registry.remove(&id) else {
            return false;
        };

        if let Some(state) = self.scope_states.get_mut(&binding.scope_id) {
            if state.detach(id, &binding.combo) {
                // Fall back to the newest surviving registration of the same combo
                let survivor = self
                    .registry
                    .iter()
                    .rev()
                    .find(|(_, b)| {
                        b.scope_id == binding.scope_id
                            && normalize_combo(&b.combo) == normalize_combo(&binding.combo)
                    });
                if let Some((&survivor_id, survivor)) = survivor {
                    state.attach(survivor_id, survivor.clone());
                }
            }
        }

        self.reconcile();
        self.debug_log(&format!("Unregistered hotkey {} {}", id, binding.combo));
        true
    }

    pub fn binding(&self, id: BindingId) -> Option<&HotkeyBinding> {
        self.registry.get(&id)
    }

    pub fn binding_count(&self) -> usize {
        self.registry.len()
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Register a scope, or replace the definition of an existing one.
    ///
    /// A new scope starts inactive and picks up every registry binding that targets it.
    pub fn register_scope(&mut self, scope_id: impl Into<String>, mut definition: ScopeDefinition) {
        let scope_id = scope_id.into();
        definition.id = scope_id.clone();
        let replaced = self.resolver.register_scope(definition).is_some();

        if replaced && self.scope_states.contains_key(&scope_id) {
            self.debug_log(&format!("Replaced scope definition {}", scope_id));
            if self.is_scope_active(&scope_id) {
                self.reconcile();
            }
        } else {
            let mut state = ScopeState::new(scope_id.clone());
            for (id, binding) in self.registry.iter().filter(|(_, b)| b.scope_id == scope_id) {
                state.attach(*id, binding.clone());
            }
            if !state.hotkeys.is_empty() {
                tracing::debug!(
                    category = "SCOPE",
                    scope_id = %scope_id,
                    reattached = state.hotkeys.len(),
                    "Reattached registry bindings"
                );
            }
            self.scope_states.insert(scope_id.clone(), state);
            logging::log_scope_event(&scope_id, "registered");
        }

        let depth = self.resolver.scope_hierarchy(&scope_id).len();
        if depth > self.config.max_scope_depth {
            tracing::warn!(
                category = "SCOPE",
                scope_id = %scope_id,
                depth,
                max_depth = self.config.max_scope_depth,
                "Scope hierarchy exceeds maximum depth"
            );
        }
    }

    /// Deactivate and drop a scope. Its bindings stay in the registry.
    pub fn unregister_scope(&mut self, scope_id: &str) -> bool {
        if !self.resolver.contains(scope_id) {
            return false;
        }
        self.deactivate_scope(scope_id);
        self.resolver.unregister_scope(scope_id);
        self.scope_states.remove(scope_id);
        logging::log_scope_event(scope_id, "unregistered");
        true
    }

    pub fn scope_definition(&self, scope_id: &str) -> Option<&ScopeDefinition> {
        self.resolver.definition(scope_id)
    }

    pub fn scope_state(&self, scope_id: &str) -> Option<&ScopeState> {
        self.scope_states.get(scope_id)
    }

    pub fn is_scope_active(&self, scope_id: &str) -> bool {
        self.active_scopes.iter().any(|id| id == scope_id)
    }

    /// Active scope ids in activation order.
    pub fn active_scopes(&self) -> Vec<String> {
        self.active_scopes.clone()
    }

    pub fn activate_scope(&mut self, scope_id: &str, context: Option<&FocusContext>) {
        if self.set_scope_active(scope_id, context) {
            self.reconcile();
            self.events
                .emit(HotkeyEvent::ScopeActivated(scope_id.to_string()));
            logging::log_scope_event(scope_id, "activated");
        }
    }

    pub fn deactivate_scope(&mut self, scope_id: &str) {
        if self.set_scope_inactive(scope_id) {
            self.reconcile();
            self.events
                .emit(HotkeyEvent::ScopeDeactivated(scope_id.to_string()));
            logging::log_scope_event(scope_id, "deactivated");
        }
    }

    /// Flip a scope to active without reconciling. Returns true if it changed.
    fn set_scope_active(&mut self, scope_id: &str, context: Option<&FocusContext>) -> bool {
        if self.is_scope_active(scope_id) {
            return false;
        }

        let Some(definition) = self.resolver.definition(scope_id) else {
            tracing::warn!(category = "SCOPE", scope_id, "Scope not found");
            return false;
        };

        if let Some(context) = context {
            if !definition.accepts(context) {
                self.debug_log(&format!("Scope {} rejected focus context", scope_id));
                return false;
            }
        }

        let Some(state) = self.scope_states.get_mut(scope_id) else {
            return false;
        };
        state.active = true;
        state.context = context.cloned();
        state.last_activated = Some(Instant::now());
        self.active_scopes.push(scope_id.to_string());
        true
    }

    fn set_scope_inactive(&mut self, scope_id: &str) -> bool {
        let Some(index) = self.active_scopes.iter().position(|id| id == scope_id) else {
            return false;
        };
        self.active_scopes.remove(index);
        if let Some(state) = self.scope_states.get_mut(scope_id) {
            state.active = false;
            state.context = None;
        }
        true
    }

    /// Merge a partial state update. A new context the scope's condition rejects deactivates it.
    pub fn update_scope_state(&mut self, scope_id: &str, patch: ScopeStatePatch) {
        let Some(state) = self.scope_states.get_mut(scope_id) else {
            return;
        };
        let context = patch.context.clone();
        state.apply_patch(patch);

        if let Some(context) = context {
            let rejected = self
                .resolver
                .definition(scope_id)
                .is_some_and(|definition| !definition.accepts(&context));
            if rejected && self.is_scope_active(scope_id) {
                self.deactivate_scope(scope_id);
            }
        }
    }

    /// Replace a scope's activation condition and re-evaluate it if the scope is active.
    pub fn update_scope_condition(&mut self, scope_id: &str, condition: impl Fn() -> bool + 'static) {
        let Some(definition) = self.resolver.definition_mut(scope_id) else {
            return;
        };
        let condition = Rc::new(condition);
        let for_definition = Rc::clone(&condition);
        definition.conditional_activation = Some(Rc::new(move |_: &FocusContext| for_definition()));

        if self.is_scope_active(scope_id) {
            if condition() {
                self.reconcile();
            } else {
                self.deactivate_scope(scope_id);
            }
        }
    }

    /// Resolver validation plus the configured depth limit.
    pub fn validate_scope_hierarchy(&self) -> Vec<String> {
        let mut errors = self.resolver.validate_scope_hierarchy();
        for definition in self.resolver.definitions() {
            let depth = self.resolver.scope_hierarchy(&definition.id).len();
            if depth > self.config.max_scope_depth {
                errors.push(format!(
                    "Scope \"{}\" is nested {} levels deep (max {})",
                    definition.id, depth, self.config.max_scope_depth
                ));
            }
        }
        errors
    }

    pub fn scope_hierarchy(&self, scope_id: &str) -> Vec<String> {
        self.resolver.scope_hierarchy(scope_id)
    }

    // ========================================================================
    // Focus
    // ========================================================================

    /// Align active scopes with a focus context.
    ///
    /// With a context, every scope on its path is activated and every other active scope
    /// except `global` is deactivated. Without one, every active scope is deactivated.
    pub fn update_focus_context(&mut self, context: Option<FocusContext>) {
        let previous = std::mem::replace(&mut self.focus_context, context.clone());
        let mut activated = Vec::new();
        let mut deactivated = Vec::new();

        match &context {
            Some(ctx) => {
                for scope_id in &ctx.scope_path {
                    if self.set_scope_active(scope_id, Some(ctx)) {
                        activated.push(scope_id.clone());
                    }
                }
                let stale: Vec<String> = self
                    .active_scopes
                    .iter()
                    .filter(|id| id.as_str() != GLOBAL_SCOPE && !ctx.contains_scope(id))
                    .cloned()
                    .collect();
                for scope_id in stale {
                    if self.set_scope_inactive(&scope_id) {
                        deactivated.push(scope_id);
                    }
                }
            }
            None => {
                for scope_id in std::mem::take(&mut self.active_scopes) {
                    if let Some(state) = self.scope_states.get_mut(&scope_id) {
                        state.active = false;
                        state.context = None;
                    }
                    deactivated.push(scope_id);
                }
                self.debug_log("Focus context cleared");
            }
        }

        // Filtering depends on the context even when no scope changed
        self.reconcile();

        for scope_id in activated {
            logging::log_scope_event(&scope_id, "activated");
            self.events.emit(HotkeyEvent::ScopeActivated(scope_id));
        }
        for scope_id in deactivated {
            logging::log_scope_event(&scope_id, "deactivated");
            self.events.emit(HotkeyEvent::ScopeDeactivated(scope_id));
        }
        self.events.emit(HotkeyEvent::FocusChanged(context.clone()));

        self.debug_log(&format!(
            "Focus context updated: {} -> {}",
            previous.as_ref().map_or("none", |c| c.scope_id.as_str()),
            context.as_ref().map_or("none", |c| c.scope_id.as_str())
        ));
    }

    pub fn focus_context(&self) -> Option<&FocusContext> {
        self.focus_context.as_ref()
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Recompute the resolved map and push it to the adapter.
    pub fn reconcile(&mut self) {
        let start = Instant::now();

        let mut active: Vec<&ScopeDefinition> = self
            .active_scopes
            .iter()
            .filter_map(|id| self.resolver.definition(id))
            .collect();
        active.sort_by(|a, b| b.priority.cmp(&a.priority));
        let active_count = active.len();

        self.resolved = self.resolver.resolve_active_hotkeys(
            &active,
            &self.scope_states,
            self.focus_context.as_ref(),
        );
        self.adapter.update_bindings(&self.resolved).log_err();

        let elapsed = start.elapsed();
        self.metrics.hotkey_latency = elapsed;
        self.metrics.reconcile_count += 1;
        logging::log_reconcile(elapsed, active_count, self.resolved.len());
        if self.config.debug_mode {
            logging::log(
                "HOTKEY",
                &format!(
                    "Reconciled hotkeys: {} active scopes, {} resolved",
                    active_count,
                    self.resolved.len()
                ),
            );
        }
    }

    /// Copy of the resolved map.
    pub fn get_active_hotkeys(&self) -> ResolvedHotkeys {
        self.resolved.clone()
    }

    /// Every pre-merge candidate from the active scopes.
    pub fn candidate_hotkeys(&self) -> Vec<ResolvedHotkey> {
        let active: Vec<&ScopeDefinition> = self
            .active_scopes
            .iter()
            .filter_map(|id| self.resolver.definition(id))
            .collect();
        self.resolver.candidate_hotkeys(&active, &self.scope_states)
    }

    /// Combos claimed by more than one active scope, with every claimant.
    pub fn conflicting_hotkeys(&self) -> BTreeMap<String, Vec<ResolvedHotkey>> {
        ScopeResolver::conflicting_hotkeys(&self.candidate_hotkeys())
    }

    pub fn get_debug_info(&self) -> HotkeyDebugInfo {
        HotkeyDebugInfo {
            active_scopes: self.active_scopes.clone(),
            registered_hotkeys: self.resolved.clone(),
            focus_context: self.focus_context.clone(),
            performance_metrics: self.metrics,
            scope_hierarchy: self.resolver.definitions().cloned().collect(),
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Offer a key event to the resolved bindings.
    pub fn handle_key_event(&mut self, event: &mut KeyEvent) -> DispatchOutcome {
        if !self.config.enabled {
            return DispatchOutcome::Unmatched;
        }

        let context = self.focus_context.as_ref();
        let spawner = self.spawner.as_deref();
        let mut matched: Option<String> = None;
        let outcome = self.adapter.dispatch(event, |hotkey, event| {
            matched = Some(hotkey.combo.clone());
            run_handler(hotkey, event, context, spawner)
        });

        match outcome {
            DispatchOutcome::Handled | DispatchOutcome::Deferred => {
                self.metrics.dispatched += 1;
                if let Some(combo) = matched {
                    self.events.emit(HotkeyEvent::HotkeyTriggered {
                        combo,
                        context: self.focus_context.clone(),
                    });
                }
            }
            DispatchOutcome::Failed => self.metrics.failed += 1,
            DispatchOutcome::Unmatched => {}
        }
        outcome
    }

    // ========================================================================
    // Configuration and events
    // ========================================================================

    pub fn config(&self) -> &HotkeyConfig {
        &self.config
    }

    pub fn update_config(&mut self, patch: &HotkeyConfigPatch) -> Result<()> {
        let enabled_changed = self.config.apply(patch);
        self.adapter.update_config(&self.config)?;
        if enabled_changed {
            logging::log(
                "HOTKEY",
                if self.config.enabled {
                    "Hotkeys enabled"
                } else {
                    "Hotkeys disabled"
                },
            );
        }
        Ok(())
    }

    pub fn on(&mut self, kind: HotkeyEventKind, callback: impl Fn(&HotkeyEvent) + 'static) -> ListenerId {
        self.events.on(kind, Rc::new(callback))
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub fn listener_count(&self, kind: HotkeyEventKind) -> usize {
        self.events.listener_count(kind)
    }

    pub fn adapter(&self) -> &KeyBindingAdapter {
        &self.adapter
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics
    }

    /// Tear down the key subscription and drop every binding, scope and listener.
    pub fn destroy(&mut self) {
        self.adapter.destroy();
        self.registry.clear();
        self.resolver.clear();
        self.scope_states.clear();
        self.active_scopes.clear();
        self.resolved.clear();
        self.focus_context = None;
        self.events.clear();
        logging::log("HOTKEY", "Hotkey manager destroyed");
    }

    fn debug_log(&self, message: &str) {
        if self.config.debug_mode {
            logging::log_debug("HOTKEY", message);
        }
    }
}

impl FocusSink for HotkeyManager {
    fn scope_priority(&self, scope_id: &str) -> Option<i32> {
        self.resolver.definition(scope_id).map(|d| d.priority)
    }

    fn apply_focus_context(&mut self, context: Option<FocusContext>) {
        let cleared = context.is_none();
        self.update_focus_context(context);
        if cleared {
            self.activate_scope(GLOBAL_SCOPE, None);
        }
    }
}

/// Invoke a resolved handler. Deferred handlers are spawned and their errors logged later.
fn run_handler(
    hotkey: &ResolvedHotkey,
    event: &KeyEvent,
    context: Option<&FocusContext>,
    spawner: Option<&dyn TaskSpawner>,
) -> DispatchOutcome {
    if hotkey.disabled {
        return DispatchOutcome::Unmatched;
    }

    match &hotkey.handler {
        HotkeyHandler::Immediate(handler) => match handler(event, context) {
            Ok(()) => DispatchOutcome::Handled,
            Err(e) => {
                logging::log_handler_error(&hotkey.combo, &hotkey.scope_id, &format!("{e:#}"));
                DispatchOutcome::Failed
            }
        },
        HotkeyHandler::Deferred(handler) => {
            let Some(spawner) = spawner else {
                logging::log_handler_error(
                    &hotkey.combo,
                    &hotkey.scope_id,
                    "no task spawner configured for deferred handler",
                );
                return DispatchOutcome::Failed;
            };

            let future = handler(event, context);
            let combo = hotkey.combo.clone();
            let scope_id = hotkey.scope_id.clone();
            let task: LocalTask = Box::pin(async move {
                if let Err(e) = future.await {
                    logging::log_handler_error(&combo, &scope_id, &format!("{e:#}"));
                }
            });

            match spawner.spawn(task) {
                Ok(()) => DispatchOutcome::Deferred,
                Err(e) => {
                    logging::log_handler_error(&hotkey.combo, &hotkey.scope_id, &format!("{e:#}"));
                    DispatchOutcome::Failed
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
