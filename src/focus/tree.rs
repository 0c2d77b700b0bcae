//! Host UI tree seams plus an in-memory tree for headless hosts and tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use super::context::{ElementId, ElementKind};

/// Read access to the host's element tree.
pub trait FocusTree {
    fn parent(&self, element: ElementId) -> Option<ElementId>;
    /// Scope id marked on this element, if it is a scope boundary.
    fn scope_marker(&self, element: ElementId) -> Option<String>;
    fn kind(&self, element: ElementId) -> ElementKind;
    /// Element that currently holds keyboard focus.
    fn active_element(&self) -> Option<ElementId>;
}

/// Write access for marking elements as scope boundaries.
pub trait ScopeMarkers {
    fn set_scope_marker(&mut self, element: ElementId, scope_id: &str);
    fn clear_scope_marker(&mut self, element: ElementId);

    /// Attach a scope's metadata to its boundary element. An empty map clears it.
    /// Hosts without per-element storage can ignore this.
    fn set_scope_metadata(
        &mut self,
        _element: ElementId,
        _metadata: &BTreeMap<String, serde_json::Value>,
    ) {
    }
}

impl<T: FocusTree> FocusTree for Rc<RefCell<T>> {
    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.borrow().parent(element)
    }

    fn scope_marker(&self, element: ElementId) -> Option<String> {
        self.borrow().scope_marker(element)
    }

    fn kind(&self, element: ElementId) -> ElementKind {
        self.borrow().kind(element)
    }

    fn active_element(&self) -> Option<ElementId> {
        self.borrow().active_element()
    }
}

impl<T: ScopeMarkers> ScopeMarkers for Rc<RefCell<T>> {
    fn set_scope_marker(&mut self, element: ElementId, scope_id: &str) {
        self.borrow_mut().set_scope_marker(element, scope_id);
    }

    fn clear_scope_marker(&mut self, element: ElementId) {
        self.borrow_mut().clear_scope_marker(element);
    }

    fn set_scope_metadata(
        &mut self,
        element: ElementId,
        metadata: &BTreeMap<String, serde_json::Value>,
    ) {
        self.borrow_mut().set_scope_metadata(element, metadata);
    }
}

#[derive(Debug, Clone, Default)]
struct Node {
    parent: Option<ElementId>,
    kind: ElementKind,
    scope: Option<String>,
    metadata: BTreeMap<String, serde_json::Value>,
}

/// Simple parent-linked element tree.
#[derive(Debug, Clone, Default)]
pub struct ElementTree {
    nodes: HashMap<ElementId, Node>,
    next_id: u64,
    active: Option<ElementId>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root element.
    pub fn add_root(&mut self, kind: ElementKind) -> ElementId {
        self.insert(None, kind)
    }

    /// Add a child under `parent`.
    pub fn add_child(&mut self, parent: ElementId, kind: ElementKind) -> ElementId {
        self.insert(Some(parent), kind)
    }

    /// Insert an element with a caller-chosen id, e.g. when loading a scenario.
    pub fn insert_with_id(&mut self, id: ElementId, parent: Option<ElementId>, kind: ElementKind) {
        self.next_id = self.next_id.max(id.0 + 1);
        self.nodes.insert(
            id,
            Node {
                parent,
                kind,
                scope: None,
                metadata: BTreeMap::new(),
            },
        );
    }

    fn insert(&mut self, parent: Option<ElementId>, kind: ElementKind) -> ElementId {
        let id = ElementId(self.next_id);
        self.insert_with_id(id, parent, kind);
        id
    }

    /// Remove an element. Children keep their dangling parent link and stop resolving past it.
    pub fn remove(&mut self, element: ElementId) -> bool {
        if self.active == Some(element) {
            self.active = None;
        }
        self.nodes.remove(&element).is_some()
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.nodes.contains_key(&element)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn set_active(&mut self, element: Option<ElementId>) {
        self.active = element.filter(|id| self.nodes.contains_key(id));
    }

    /// Scope metadata marked on a boundary element.
    pub fn scope_metadata(&self, element: ElementId) -> Option<&BTreeMap<String, serde_json::Value>> {
        self.nodes
            .get(&element)
            .map(|n| &n.metadata)
            .filter(|metadata| !metadata.is_empty())
    }

    /// Ancestors of `element`, nearest first, excluding the element itself.
    pub fn ancestors(&self, element: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut current = self.parent(element);
        while let Some(id) = current {
            if out.contains(&id) || !self.contains(id) {
                break;
            }
            out.push(id);
            current = self.parent(id);
        }
        out
    }
}

impl FocusTree for ElementTree {
    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.nodes.get(&element).and_then(|n| n.parent)
    }

    fn scope_marker(&self, element: ElementId) -> Option<String> {
        self.nodes.get(&element).and_then(|n| n.scope.clone())
    }

    fn kind(&self, element: ElementId) -> ElementKind {
        self.nodes.get(&element).map(|n| n.kind).unwrap_or_default()
    }

    fn active_element(&self) -> Option<ElementId> {
        self.active
    }
}

impl ScopeMarkers for ElementTree {
    fn set_scope_marker(&mut self, element: ElementId, scope_id: &str) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.scope = Some(scope_id.to_string());
        }
    }

    fn clear_scope_marker(&mut self, element: ElementId) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.scope = None;
            node.metadata.clear();
        }
    }

    fn set_scope_metadata(
        &mut self,
        element: ElementId,
        metadata: &BTreeMap<String, serde_json::Value>,
    ) {
        if let Some(node) = self.nodes.get_mut(&element) {
            node.metadata = metadata.clone();
        }
    }
}
