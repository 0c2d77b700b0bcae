//! Scope definitions and per-scope state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use crate::binding::{BindingId, HotkeyBinding};
use crate::combo::normalize_combo;
use crate::focus::{ElementRef, FocusContext};

/// Id of the scope seeded and activated by every manager.
pub const GLOBAL_SCOPE: &str = "global";

/// How a scope's hotkeys merge with those already resolved from lower-priority scopes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Higher effective priority replaces the recorded entry.
    #[default]
    Union,
    /// Only fills combos nobody has claimed yet.
    Additive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InheritedCombos {
    /// Serialized as `"*"`.
    All(AllCombos),
    Only(Vec<String>),
}

/// Marker for the `"*"` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllCombos {
    #[serde(rename = "*")]
    Wildcard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceMode {
    #[default]
    Inherit,
    Block,
    Override,
}

/// Declared relationship to another scope's hotkeys. Validated, not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InheritanceRule {
    pub from_scope: String,
    pub combos: InheritedCombos,
    #[serde(default)]
    pub mode: InheritanceMode,
}

impl InheritanceRule {
    pub fn inherit_all(from_scope: impl Into<String>) -> Self {
        Self {
            from_scope: from_scope.into(),
            combos: InheritedCombos::All(AllCombos::Wildcard),
            mode: InheritanceMode::Inherit,
        }
    }
}

/// Predicate deciding whether a scope applies to a focus context.
pub type ScopeCondition = Rc<dyn Fn(&FocusContext) -> bool>;

#[derive(Clone)]
pub struct ScopeDefinition {
    pub id: String,
    pub parent_id: Option<String>,
    pub priority: i32,
    pub strategy: MergeStrategy,
    pub hotkey_inheritance: Vec<InheritanceRule>,
    pub conditional_activation: Option<ScopeCondition>,
    pub auto_activate: bool,
    pub focus_selector: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ScopeDefinition {
    pub fn new(id: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            priority,
            strategy: MergeStrategy::Union,
            hotkey_inheritance: Vec::new(),
            conditional_activation: None,
            auto_activate: false,
            focus_selector: None,
            metadata: BTreeMap::new(),
        }
    }

    /// The seeded global scope: priority 0, union, auto-activated.
    pub fn global() -> Self {
        Self {
            auto_activate: true,
            ..Self::new(GLOBAL_SCOPE, 0)
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_inheritance(mut self, rule: InheritanceRule) -> Self {
        self.hotkey_inheritance.push(rule);
        self
    }

    pub fn with_condition(mut self, condition: impl Fn(&FocusContext) -> bool + 'static) -> Self {
        self.conditional_activation = Some(Rc::new(condition));
        self
    }

    pub fn auto_activate(mut self, auto_activate: bool) -> Self {
        self.auto_activate = auto_activate;
        self
    }

    pub fn with_focus_selector(mut self, selector: impl Into<String>) -> Self {
        self.focus_selector = Some(selector.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether the scope applies to `context`. No condition means it always does.
    pub fn accepts(&self, context: &FocusContext) -> bool {
        self.conditional_activation
            .as_ref()
            .map_or(true, |condition| condition(context))
    }

    /// Serializable view without the condition closure.
    pub fn summary(&self) -> ScopeSummary {
        ScopeSummary {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            priority: self.priority,
            strategy: self.strategy,
            hotkey_inheritance: self.hotkey_inheritance.clone(),
            conditional: self.conditional_activation.is_some(),
            auto_activate: self.auto_activate,
            focus_selector: self.focus_selector.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl fmt::Debug for ScopeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeDefinition")
            .field("id", &self.id)
            .field("parent_id", &self.parent_id)
            .field("priority", &self.priority)
            .field("strategy", &self.strategy)
            .field("hotkey_inheritance", &self.hotkey_inheritance)
            .field("conditional", &self.conditional_activation.is_some())
            .field("auto_activate", &self.auto_activate)
            .field("focus_selector", &self.focus_selector)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub priority: i32,
    pub strategy: MergeStrategy,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hotkey_inheritance: Vec<InheritanceRule>,
    pub conditional: bool,
    pub auto_activate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_selector: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Runtime state of a registered scope.
#[derive(Debug, Clone)]
pub struct ScopeState {
    pub id: String,
    pub active: bool,
    /// Normalized combo → the binding currently claiming it in this scope.
    pub hotkeys: HashMap<String, HotkeyBinding>,
    pub context: Option<FocusContext>,
    pub element: Option<ElementRef>,
    pub last_activated: Option<Instant>,
    pub(crate) owners: HashMap<String, BindingId>,
}

impl ScopeState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: false,
            hotkeys: HashMap::new(),
            context: None,
            element: None,
            last_activated: None,
            owners: HashMap::new(),
        }
    }

    /// Claim `binding.combo` for `id`, replacing any previous claim on any spelling of it.
    pub(crate) fn attach(&mut self, id: BindingId, binding: HotkeyBinding) {
        let key = normalize_combo(&binding.combo);
        self.owners.insert(key.clone(), id);
        self.hotkeys.insert(key, binding);
    }

    /// Release `combo` if `id` still owns it.
    pub(crate) fn detach(&mut self, id: BindingId, combo: &str) -> bool {
        let key = normalize_combo(combo);
        if self.owners.get(&key) != Some(&id) {
            return false;
        }
        self.owners.remove(&key);
        self.hotkeys.remove(&key);
        true
    }

    pub fn owner_of(&self, combo: &str) -> Option<BindingId> {
        self.owners.get(&normalize_combo(combo)).copied()
    }

    pub(crate) fn apply_patch(&mut self, patch: ScopeStatePatch) {
        if let Some(context) = patch.context {
            self.context = Some(context);
        }
        if let Some(element) = patch.element {
            self.element = Some(element);
        }
    }
}

/// Partial update applied by `HotkeyManager::update_scope_state`.
#[derive(Debug, Clone, Default)]
pub struct ScopeStatePatch {
    pub context: Option<FocusContext>,
    pub element: Option<ElementRef>,
}
