//! Focus context: which scope boundary currently owns keyboard focus.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scope::GLOBAL_SCOPE;

/// Opaque handle to an element in the host's UI tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What sort of element this is, as far as text entry is concerned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    #[default]
    Generic,
    Input,
    TextArea,
    Select,
    ContentEditable,
    /// Any element carrying the textbox role
    Textbox,
}

impl ElementKind {
    /// Elements where bare keys are typed rather than used as shortcuts.
    pub fn is_text_entry(self) -> bool {
        !matches!(self, ElementKind::Generic)
    }
}

/// An element together with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub id: ElementId,
    #[serde(default)]
    pub kind: ElementKind,
}

impl ElementRef {
    pub fn new(id: ElementId, kind: ElementKind) -> Self {
        Self { id, kind }
    }
}

/// Snapshot of where focus is and which scopes it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusContext {
    /// Boundary element of the most specific scope.
    pub element: ElementRef,
    /// Element that actually holds focus.
    pub target: ElementRef,
    pub scope_id: String,
    /// Root-first, `global` first, no duplicates.
    pub scope_path: Vec<String>,
    pub priority: i32,
}

impl FocusContext {
    /// Build a context, normalizing `scope_path` to start with the global scope.
    pub fn new(
        element: ElementRef,
        target: ElementRef,
        scope_id: impl Into<String>,
        scope_path: impl IntoIterator<Item = String>,
        priority: i32,
    ) -> Self {
        let mut path = vec![GLOBAL_SCOPE.to_string()];
        for id in scope_path {
            if !path.contains(&id) {
                path.push(id);
            }
        }
        Self {
            element,
            target,
            scope_id: scope_id.into(),
            scope_path: path,
            priority,
        }
    }

    /// True when focus sits in a text-entry control.
    pub fn is_text_entry(&self) -> bool {
        self.target.kind.is_text_entry() || self.element.kind.is_text_entry()
    }

    pub fn contains_scope(&self, scope_id: &str) -> bool {
        self.scope_path.iter().any(|id| id == scope_id)
    }

    /// Same scope, same boundary element, same focused element.
    pub fn is_same(&self, other: &FocusContext) -> bool {
        self.scope_id == other.scope_id
            && self.element == other.element
            && self.target == other.target
    }
}

/// Compare two optional contexts the way the tracker does before reporting a change.
pub fn is_same_context(a: Option<&FocusContext>, b: Option<&FocusContext>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_same(b),
        _ => false,
    }
}
