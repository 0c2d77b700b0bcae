//! Visibility culling and element observation.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::context::ElementId;

/// Which observer an element is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverKind {
    Intersection,
    Resize,
}

/// Host-side visibility information and observer registration.
pub trait VisibilitySource {
    /// False for detached elements or elements hidden by style.
    fn is_rendered(&self, element: ElementId) -> bool;
    /// Bounding-box check against the viewport.
    fn is_in_viewport(&self, element: ElementId) -> bool;
    fn observe(&mut self, element: ElementId, kind: ObserverKind);
    fn unobserve(&mut self, element: ElementId, kind: ObserverKind);
    /// Drop every observation.
    fn disconnect(&mut self);
}

/// Axis-aligned element bounds in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Fully contained in a viewport of the given size anchored at the origin.
    pub fn within(&self, viewport_width: f64, viewport_height: f64) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= viewport_width
            && self.y + self.height <= viewport_height
    }
}

/// In-memory visibility source.
///
/// Elements are rendered and in view unless hidden or given bounds outside the viewport.
#[derive(Debug, Clone)]
pub struct StaticVisibility {
    hidden: HashSet<ElementId>,
    bounds: HashMap<ElementId, Rect>,
    viewport: (f64, f64),
    observed: HashSet<(ElementId, ObserverKind)>,
    disconnects: usize,
}

impl Default for StaticVisibility {
    fn default() -> Self {
        Self {
            hidden: HashSet::new(),
            bounds: HashMap::new(),
            viewport: (1280.0, 800.0),
            observed: HashSet::new(),
            disconnects: 0,
        }
    }
}

impl StaticVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide(&mut self, element: ElementId) {
        self.hidden.insert(element);
    }

    pub fn show(&mut self, element: ElementId) {
        self.hidden.remove(&element);
    }

    pub fn set_bounds(&mut self, element: ElementId, rect: Rect) {
        self.bounds.insert(element, rect);
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
    }

    pub fn is_observed(&self, element: ElementId, kind: ObserverKind) -> bool {
        self.observed.contains(&(element, kind))
    }

    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects
    }
}

impl VisibilitySource for StaticVisibility {
    fn is_rendered(&self, element: ElementId) -> bool {
        !self.hidden.contains(&element)
    }

    fn is_in_viewport(&self, element: ElementId) -> bool {
        match self.bounds.get(&element) {
            Some(rect) => rect.within(self.viewport.0, self.viewport.1),
            None => true,
        }
    }

    fn observe(&mut self, element: ElementId, kind: ObserverKind) {
        self.observed.insert((element, kind));
    }

    fn unobserve(&mut self, element: ElementId, kind: ObserverKind) {
        self.observed.remove(&(element, kind));
    }

    fn disconnect(&mut self) {
        self.observed.clear();
        self.disconnects += 1;
    }
}
