//! JSON scenarios: a scripted headless host for the engine.
//!
//! A scenario declares an element tree, scopes, bindings and a list of steps. Running it
//! drives a `HotkeyEngine` over an `ElementTree` with a virtual clock and reports which
//! handlers fired, plus debug snapshots along the way.
//!
//! ```json
//! {
//!   "elements": [{ "id": 1 }, { "id": 2, "parent": 1 }],
//!   "scopes": [{ "id": "table", "priority": 10, "element": 2 }],
//!   "bindings": [{ "combo": "$mod+a", "scope": "table", "label": "select-rows" }],
//!   "steps": [
//!     { "step": "focus", "event": { "type": "focusIn", "target": 2 } },
//!     { "step": "frame" },
//!     { "step": "key", "combo": "$mod+a" }
//!   ]
//! }
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::executor::LocalPool;
use serde::{Deserialize, Serialize};

use crate::binding::{DispatchOutcome, HotkeyBinding, HotkeyHandler, KeyEvent};
use crate::config::{HotkeyConfig, HotkeyConfigPatch};
use crate::engine::HotkeyEngine;
use crate::error::{HotkeyError, Result};
use crate::focus::{ElementId, ElementKind, ElementTree, FocusEvent, StaticVisibility};
use crate::key_adapter::DetachedKeySource;
use crate::manager::{DebugSummary, FocusScopeOptions, HotkeyEvent, HotkeyEventKind};
use crate::scope::{InheritanceRule, MergeStrategy, ScopeDefinition, GLOBAL_SCOPE};

// ============================================
// SCENARIO FILE
// ============================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Applied on top of the caller's config before anything runs
    #[serde(default)]
    pub config: HotkeyConfigPatch,
    #[serde(default)]
    pub elements: Vec<ElementEntry>,
    #[serde(default)]
    pub scopes: Vec<ScopeEntry>,
    #[serde(default)]
    pub bindings: Vec<BindingEntry>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementEntry {
    pub id: ElementId,
    #[serde(default)]
    pub parent: Option<ElementId>,
    #[serde(default)]
    pub kind: ElementKind,
    /// Not rendered; focus moving to it is ignored
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeEntry {
    pub id: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub strategy: MergeStrategy,
    /// Boundary element; the scope is mounted on it when set
    #[serde(default)]
    pub element: Option<ElementId>,
    /// Defaults to true for mounted scopes, false otherwise
    #[serde(default)]
    pub auto_activate: Option<bool>,
    #[serde(default)]
    pub inherit_from: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingEntry {
    pub combo: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub prevent_default: Option<bool>,
    #[serde(default)]
    pub stop_propagation: Option<bool>,
    /// Recorded when the handler runs; defaults to `scope:combo`
    #[serde(default)]
    pub label: Option<String>,
    /// Run the handler on the local executor instead of inline
    #[serde(default)]
    pub deferred: bool,
    /// Handler returns an error instead of succeeding
    #[serde(default)]
    pub fails: bool,
}

fn default_scope() -> String {
    GLOBAL_SCOPE.to_string()
}

impl BindingEntry {
    fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.scope, self.combo))
    }
}

/// One scripted host action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    Focus { event: FocusEvent },
    /// Run the pending animation-frame task
    Frame,
    /// Move the virtual clock forward and fire due timers
    Advance { ms: u64 },
    Key { combo: String },
    Activate { scope: String },
    Deactivate { scope: String },
    /// Change the element the tree reports as focused, without a focus event
    SetActive { element: Option<ElementId> },
    Config { patch: HotkeyConfigPatch },
    Snapshot {
        #[serde(default)]
        label: Option<String>,
    },
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HotkeyError::Scenario(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| HotkeyError::Scenario(format!("invalid scenario: {}", e)))
    }
}

// ============================================
// REPORT
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub combo: String,
    pub outcome: DispatchOutcome,
    /// Labels of the handlers that ran, in order
    pub invoked: Vec<String>,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub subscribed: Vec<String>,
    pub state: DebugSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub dispatches: Vec<DispatchRecord>,
    pub snapshots: Vec<ScenarioSnapshot>,
    /// Manager events as `kind` or `kind:scope`
    pub events: Vec<String>,
    #[serde(rename = "final")]
    pub final_state: DebugSummary,
    pub validation_errors: Vec<String>,
}

fn describe_event(event: &HotkeyEvent) -> String {
    let kind = event.kind().as_str();
    match event {
        HotkeyEvent::ScopeActivated(scope) | HotkeyEvent::ScopeDeactivated(scope) => {
            format!("{}:{}", kind, scope)
        }
        HotkeyEvent::HotkeyTriggered { combo, .. } => format!("{}:{}", kind, combo),
        HotkeyEvent::FocusChanged(context) => match context {
            Some(ctx) => format!("{}:{}", kind, ctx.scope_id),
            None => kind.to_string(),
        },
    }
}

// ============================================
// RUNNER
// ============================================

type Engine = HotkeyEngine<ElementTree, StaticVisibility>;

impl Scenario {
    /// Build the host described by the scenario and play every step.
    pub fn run(&self, mut config: HotkeyConfig) -> Result<ScenarioReport> {
        config.apply(&self.config);

        let mut tree = ElementTree::new();
        let mut visibility = StaticVisibility::new();
        for element in &self.elements {
            tree.insert_with_id(element.id, element.parent, element.kind);
            if element.hidden {
                visibility.hide(element.id);
            }
        }

        let mut engine: Engine =
            HotkeyEngine::new(config, tree, visibility, Box::new(DetachedKeySource));
        let mut pool = LocalPool::new();
        engine
            .manager_mut()
            .set_task_spawner(Rc::new(pool.spawner()));

        let events = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            HotkeyEventKind::ScopeActivated,
            HotkeyEventKind::ScopeDeactivated,
            HotkeyEventKind::HotkeyTriggered,
            HotkeyEventKind::FocusChanged,
        ] {
            let events = Rc::clone(&events);
            engine
                .manager_mut()
                .on(kind, move |event| events.borrow_mut().push(describe_event(event)));
        }

        self.install_scopes(&mut engine);
        let invoked = Rc::new(RefCell::new(Vec::new()));
        self.install_bindings(&mut engine, &invoked)?;

        let start = Instant::now();
        let mut elapsed = Duration::ZERO;
        let mut dispatches = Vec::new();
        let mut snapshots = Vec::new();

        for step in &self.steps {
            let now = start + elapsed;
            match step {
                Step::Focus { event } => engine.handle_focus_event(event.clone(), now),
                Step::Frame => engine.on_animation_frame(),
                Step::Advance { ms } => {
                    elapsed += Duration::from_millis(*ms);
                    engine.advance(start + elapsed);
                }
                Step::Key { combo } => {
                    invoked.borrow_mut().clear();
                    let mut event = KeyEvent::new(combo.clone());
                    let outcome = engine.handle_key_event(&mut event, now);
                    pool.run_until_stalled();
                    dispatches.push(DispatchRecord {
                        combo: combo.clone(),
                        outcome,
                        invoked: invoked.borrow_mut().drain(..).collect(),
                        default_prevented: event.is_default_prevented(),
                        propagation_stopped: event.is_propagation_stopped(),
                    });
                }
                Step::Activate { scope } => engine.manager_mut().activate_scope(scope, None),
                Step::Deactivate { scope } => engine.manager_mut().deactivate_scope(scope),
                Step::SetActive { element } => engine.tracker_mut().tree_mut().set_active(*element),
                Step::Config { patch } => engine.update_config(patch)?,
                Step::Snapshot { label } => snapshots.push(ScenarioSnapshot {
                    label: label.clone(),
                    subscribed: engine.manager().adapter().subscribed_combos(),
                    state: engine.manager().get_debug_info().summary(),
                }),
            }
        }

        let report = ScenarioReport {
            dispatches,
            snapshots,
            events: events.borrow().clone(),
            final_state: engine.manager().get_debug_info().summary(),
            validation_errors: engine.manager().validate_scope_hierarchy(),
        };
        engine.destroy();
        Ok(report)
    }

    fn install_scopes(&self, engine: &mut Engine) {
        for entry in &self.scopes {
            match entry.element {
                Some(element) => {
                    let options = FocusScopeOptions {
                        priority: entry.priority,
                        parent_scope: entry.parent.clone(),
                        strategy: entry.strategy,
                        auto_activate: entry.auto_activate.unwrap_or(true),
                        inherit_from: entry.inherit_from.clone(),
                        metadata: entry.metadata.clone(),
                        ..FocusScopeOptions::default()
                    };
                    engine.mount_focus_scope(element, &entry.id, options);
                }
                None => {
                    let mut definition = ScopeDefinition::new(&entry.id, entry.priority)
                        .with_strategy(entry.strategy)
                        .auto_activate(entry.auto_activate.unwrap_or(false));
                    definition.parent_id = entry.parent.clone();
                    definition.metadata = entry.metadata.clone();
                    for from in &entry.inherit_from {
                        definition = definition.with_inheritance(InheritanceRule::inherit_all(from));
                    }
                    let activate = definition.auto_activate;
                    engine.manager_mut().register_scope(&entry.id, definition);
                    if activate {
                        engine.manager_mut().activate_scope(&entry.id, None);
                    }
                }
            }
        }
    }

    fn install_bindings(
        &self,
        engine: &mut Engine,
        invoked: &Rc<RefCell<Vec<String>>>,
    ) -> Result<()> {
        for entry in &self.bindings {
            let label = entry.label();
            let fails = entry.fails;
            let handler = if entry.deferred {
                let invoked = Rc::clone(invoked);
                HotkeyHandler::deferred(move |_, _| {
                    let invoked = Rc::clone(&invoked);
                    let label = label.clone();
                    async move {
                        invoked.borrow_mut().push(label.clone());
                        if fails {
                            anyhow::bail!("{} failed", label);
                        }
                        Ok(())
                    }
                })
            } else {
                let invoked = Rc::clone(invoked);
                HotkeyHandler::new(move |_, _| {
                    invoked.borrow_mut().push(label.clone());
                    if fails {
                        anyhow::bail!("{} failed", label);
                    }
                    Ok(())
                })
            };

            let mut binding = HotkeyBinding::new(&entry.combo, handler)
                .in_scope(&entry.scope)
                .disabled(entry.disabled);
            if let Some(priority) = entry.priority {
                binding = binding.with_priority(priority);
            }
            if let Some(description) = &entry.description {
                binding = binding.with_description(description);
            }
            if let Some(category) = &entry.category {
                binding = binding.with_category(category);
            }
            if let Some(prevent) = entry.prevent_default {
                binding = binding.prevent_default(prevent);
            }
            if let Some(stop) = entry.stop_propagation {
                binding = binding.stop_propagation(stop);
            }
            engine.manager_mut().register(binding)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod tests;
