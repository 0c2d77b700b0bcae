//! Mounting UI elements as scope boundaries.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::HotkeyManager;
use crate::focus::{ElementId, FocusContext, ScopeMarkers};
use crate::scope::{InheritanceRule, MergeStrategy, ScopeDefinition};

/// Options for `HotkeyManager::mount_focus_scope`.
#[derive(Clone)]
pub struct FocusScopeOptions {
    pub priority: i32,
    pub parent_scope: Option<String>,
    pub strategy: MergeStrategy,
    /// Activate as soon as the scope is mounted (default: true)
    pub auto_activate: bool,
    pub focus_selector: Option<String>,
    /// Scopes to inherit every combo from; recorded as inheritance rules
    pub inherit_from: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub conditional_activation: Option<Rc<dyn Fn() -> bool>>,
}

impl Default for FocusScopeOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            parent_scope: None,
            strategy: MergeStrategy::Union,
            auto_activate: true,
            focus_selector: None,
            inherit_from: Vec::new(),
            metadata: BTreeMap::new(),
            conditional_activation: None,
        }
    }
}

impl fmt::Debug for FocusScopeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusScopeOptions")
            .field("priority", &self.priority)
            .field("parent_scope", &self.parent_scope)
            .field("strategy", &self.strategy)
            .field("auto_activate", &self.auto_activate)
            .field("focus_selector", &self.focus_selector)
            .field("inherit_from", &self.inherit_from)
            .field("conditional", &self.conditional_activation.is_some())
            .finish()
    }
}

impl FocusScopeOptions {
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    pub fn into_definition(self, scope_id: &str) -> ScopeDefinition {
        let mut definition = ScopeDefinition::new(scope_id, self.priority)
            .with_strategy(self.strategy)
            .auto_activate(self.auto_activate);
        definition.parent_id = self.parent_scope;
        definition.focus_selector = self.focus_selector;
        definition.metadata = self.metadata;
        definition.hotkey_inheritance = self
            .inherit_from
            .into_iter()
            .map(InheritanceRule::inherit_all)
            .collect();
        if let Some(condition) = self.conditional_activation {
            definition.conditional_activation = Some(Rc::new(move |_: &FocusContext| condition()));
        }
        definition
    }
}

/// A mounted scope boundary; pass back to `unmount_focus_scope`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusScopeHandle {
    pub scope_id: String,
    pub element: ElementId,
}

impl HotkeyManager {
    /// Mark `element` as the boundary of `scope_id`, copy the scope's metadata onto it, and
    /// register the scope.
    pub fn mount_focus_scope<M: ScopeMarkers + ?Sized>(
        &mut self,
        markers: &mut M,
        element: ElementId,
        scope_id: &str,
        options: FocusScopeOptions,
    ) -> FocusScopeHandle {
        markers.set_scope_marker(element, scope_id);
        markers.set_scope_metadata(element, &options.metadata);
        let definition = options.into_definition(scope_id);
        let auto_activate = definition.auto_activate;
        self.register_scope(scope_id, definition);
        if auto_activate {
            self.activate_scope(scope_id, None);
        }
        FocusScopeHandle {
            scope_id: scope_id.to_string(),
            element,
        }
    }

    /// Clear the boundary markers and deactivate the scope. The definition is kept for reuse.
    pub fn unmount_focus_scope<M: ScopeMarkers + ?Sized>(
        &mut self,
        markers: &mut M,
        handle: FocusScopeHandle,
    ) {
        markers.set_scope_metadata(handle.element, &BTreeMap::new());
        markers.clear_scope_marker(handle.element);
        self.deactivate_scope(&handle.scope_id);
    }
}
