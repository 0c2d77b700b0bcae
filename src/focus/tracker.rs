//! Focus tracking: turns raw focus, pointer and navigation events into focus contexts.
//!
//! Every raw event replaces the single pending frame task, so a burst of events costs one
//! context resolution on the next frame. Navigation keys instead arm a short settle timer
//! and read the tree's active element once it fires.

use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::coalesce::{Coalescer, Deadline};
use super::context::{is_same_context, ElementId, ElementRef, FocusContext};
use super::tree::FocusTree;
use super::visibility::{ObserverKind, VisibilitySource};
use crate::combo::canonicalize_key;
use crate::config::HotkeyConfig;
use crate::listeners::{ListenerId, ListenerSet};

/// Delay between a navigation key and reading the settled active element.
pub const NAVIGATION_SETTLE_DELAY: Duration = Duration::from_millis(10);
/// Contexts kept in the focus history.
pub const MAX_FOCUS_HISTORY: usize = 10;
/// Scope ids kept in the navigation pattern.
pub const MAX_NAVIGATION_PATTERN: usize = 5;

/// Canonical names of keys that move focus.
const NAVIGATION_KEYS: [&str; 7] = ["tab", "up", "down", "left", "right", "home", "end"];

/// Tab, the arrow keys, Home and End, in any spelling `canonicalize_key` accepts.
pub fn is_navigation_key(key: &str) -> bool {
    NAVIGATION_KEYS.contains(&canonicalize_key(key).as_str())
}

/// Receiver of resolved focus contexts. Implemented by `HotkeyManager`.
pub trait FocusSink {
    /// Priority of a registered scope, `None` if the scope is unknown.
    fn scope_priority(&self, scope_id: &str) -> Option<i32>;
    fn apply_focus_context(&mut self, context: Option<FocusContext>);
}

/// Raw events forwarded by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FocusEvent {
    FocusIn {
        target: ElementId,
    },
    /// `related` is the element receiving focus, `None` when focus leaves the tree.
    FocusOut {
        #[serde(default)]
        related: Option<ElementId>,
    },
    PointerDown {
        target: ElementId,
    },
    Click {
        target: ElementId,
    },
    KeyDown {
        key: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusUpdate {
    Element(Option<ElementId>),
    Recheck(ElementId),
}

type FocusListener = dyn Fn(Option<&FocusContext>, Option<&FocusContext>);

pub struct FocusTracker<T: FocusTree, V: VisibilitySource> {
    tree: T,
    visibility: V,
    current: Option<FocusContext>,
    history: VecDeque<FocusContext>,
    pattern: VecDeque<String>,
    listeners: ListenerSet<FocusListener>,
    frame: Coalescer<FocusUpdate>,
    settle: Deadline,
    visible: HashSet<ElementId>,
    debounce_delay: Duration,
    enable_prediction: bool,
    destroyed: bool,
}

impl<T: FocusTree, V: VisibilitySource> FocusTracker<T, V> {
    pub fn new(tree: T, visibility: V, config: &HotkeyConfig) -> Self {
        Self {
            tree,
            visibility,
            current: None,
            history: VecDeque::with_capacity(MAX_FOCUS_HISTORY),
            pattern: VecDeque::with_capacity(MAX_NAVIGATION_PATTERN),
            listeners: ListenerSet::default(),
            frame: Coalescer::new(),
            settle: Deadline::default(),
            visible: HashSet::new(),
            debounce_delay: config.debounce_duration(),
            enable_prediction: config.enable_prediction,
            destroyed: false,
        }
    }

    pub fn update_config(&mut self, config: &HotkeyConfig) {
        self.debounce_delay = config.debounce_duration();
        self.enable_prediction = config.enable_prediction;
    }

    // ========================================================================
    // Event intake
    // ========================================================================

    /// Queue a raw event. Nothing is resolved until the next frame or `advance`.
    pub fn handle_event(&mut self, event: FocusEvent, now: Instant) {
        if self.destroyed {
            return;
        }
        match event {
            FocusEvent::FocusIn { target }
            | FocusEvent::PointerDown { target }
            | FocusEvent::Click { target } => {
                self.frame.schedule(FocusUpdate::Element(Some(target)), now);
            }
            FocusEvent::FocusOut { related } => {
                self.frame.schedule(FocusUpdate::Element(related), now);
            }
            FocusEvent::KeyDown { key } => {
                if is_navigation_key(&key) {
                    self.settle.arm(now, NAVIGATION_SETTLE_DELAY);
                }
            }
        }
    }

    /// Intersection observer callback: `(element, is_intersecting)` pairs.
    pub fn on_intersection(&mut self, entries: &[(ElementId, bool)]) {
        for &(element, intersecting) in entries {
            if intersecting {
                self.visible.insert(element);
            } else {
                self.visible.remove(&element);
            }
        }
    }

    /// Resize observer callback. Ignored while a frame task is already pending.
    pub fn on_resize(&mut self, resized: &[ElementId], now: Instant) {
        if self.destroyed || self.frame.is_pending() {
            return;
        }
        if let Some(current) = &self.current {
            if resized.contains(&current.element.id) {
                self.frame
                    .schedule(FocusUpdate::Recheck(current.element.id), now);
            }
        }
    }

    // ========================================================================
    // Host ticks
    // ========================================================================

    /// Run the pending frame task, if any.
    pub fn on_animation_frame<S: FocusSink>(&mut self, sink: &mut S) {
        if self.destroyed {
            return;
        }
        if let Some(update) = self.frame.take() {
            self.process(update, sink);
        }
    }

    /// Fire the settle timer when due, and flush a frame task that waited past the debounce delay.
    pub fn advance<S: FocusSink>(&mut self, now: Instant, sink: &mut S) {
        if self.destroyed {
            return;
        }
        if self.settle.fire_if_due(now) {
            if let Some(active) = self.tree.active_element() {
                self.handle_focus_change(Some(active), sink);
            }
        }
        if let Some(update) = self.frame.take_if_stale(now, self.debounce_delay) {
            self.process(update, sink);
        }
    }

    fn process<S: FocusSink>(&mut self, update: FocusUpdate, sink: &mut S) {
        match update {
            FocusUpdate::Element(element) => self.handle_focus_change(element, sink),
            FocusUpdate::Recheck(element) => {
                let target = self
                    .current
                    .as_ref()
                    .filter(|ctx| ctx.element.id == element)
                    .map(|ctx| ctx.target.id);
                if let Some(target) = target {
                    self.handle_focus_change(Some(target), sink);
                }
            }
        }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    fn handle_focus_change<S: FocusSink>(&mut self, element: Option<ElementId>, sink: &mut S) {
        let Some(element) = element else {
            self.update_current_context(None, sink);
            return;
        };

        if !self.is_element_visible(element) {
            tracing::trace!(category = "FOCUS", element = %element, "Ignoring invisible element");
            return;
        }

        let context = self.resolve_context(element, sink);
        if is_same_context(context.as_ref(), self.current.as_ref()) {
            return;
        }
        self.update_current_context(context, sink);
    }

    fn is_element_visible(&self, element: ElementId) -> bool {
        if !self.visibility.is_rendered(element) {
            return false;
        }
        self.visible.contains(&element) || self.visibility.is_in_viewport(element)
    }

    /// Walk from `element` to the root collecting registered scope markers.
    pub fn resolve_context<S: FocusSink>(&self, element: ElementId, sink: &S) -> Option<FocusContext> {
        let mut found: Vec<String> = Vec::new();
        let mut best: Option<(ElementId, String, i32)> = None;
        let mut seen = HashSet::new();
        let mut current = Some(element);

        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            if let Some(scope_id) = self.tree.scope_marker(id) {
                if let Some(priority) = sink.scope_priority(&scope_id) {
                    if best.as_ref().map_or(true, |(_, _, p)| priority > *p) {
                        best = Some((id, scope_id.clone(), priority));
                    }
                    found.push(scope_id);
                }
            }
            current = self.tree.parent(id);
        }

        let (boundary, scope_id, priority) = best?;
        Some(FocusContext::new(
            ElementRef::new(boundary, self.tree.kind(boundary)),
            ElementRef::new(element, self.tree.kind(element)),
            scope_id,
            found.into_iter().rev(),
            priority,
        ))
    }

    fn update_current_context<S: FocusSink>(&mut self, context: Option<FocusContext>, sink: &mut S) {
        let previous = std::mem::replace(&mut self.current, context.clone());

        tracing::debug!(
            category = "FOCUS",
            scope_id = context.as_ref().map(|c| c.scope_id.as_str()).unwrap_or("none"),
            "Focus context changed"
        );
        sink.apply_focus_context(context.clone());

        if let Some(ctx) = &context {
            if self.enable_prediction {
                if self.history.len() >= MAX_FOCUS_HISTORY {
                    self.history.pop_front();
                }
                self.history.push_back(ctx.clone());
                if self.pattern.len() >= MAX_NAVIGATION_PATTERN {
                    self.pattern.pop_front();
                }
                self.pattern.push_back(ctx.scope_id.clone());
            }
        }

        self.listeners
            .notify("FOCUS", |listener| listener(context.as_ref(), previous.as_ref()));

        if let Some(ctx) = &context {
            self.visibility
                .observe(ctx.element.id, ObserverKind::Intersection);
            self.visibility.observe(ctx.element.id, ObserverKind::Resize);
        }
        if let Some(prev) = &previous {
            let new_element = context.as_ref().map(|c| c.element.id);
            if new_element != Some(prev.element.id) {
                self.visibility
                    .unobserve(prev.element.id, ObserverKind::Intersection);
                self.visibility.unobserve(prev.element.id, ObserverKind::Resize);
            }
        }
    }

    // ========================================================================
    // Listeners and accessors
    // ========================================================================

    /// Called with `(new, previous)` on every context change.
    pub fn add_listener(
        &mut self,
        listener: impl Fn(Option<&FocusContext>, Option<&FocusContext>) + 'static,
    ) -> ListenerId {
        self.listeners.add(Rc::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn current_context(&self) -> Option<&FocusContext> {
        self.current.as_ref()
    }

    /// Recent contexts, oldest first.
    pub fn focus_history(&self) -> Vec<FocusContext> {
        self.history.iter().cloned().collect()
    }

    /// Recent scope ids, oldest first.
    pub fn navigation_pattern(&self) -> Vec<String> {
        self.pattern.iter().cloned().collect()
    }

    pub fn has_pending_update(&self) -> bool {
        self.frame.is_pending() || self.settle.is_armed()
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    pub fn visibility(&self) -> &V {
        &self.visibility
    }

    pub fn visibility_mut(&mut self) -> &mut V {
        &mut self.visibility
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Cancel pending work, disconnect observers and drop listeners and history.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.frame.cancel();
        self.settle.cancel();
        self.visibility.disconnect();
        self.listeners.clear();
        self.history.clear();
        self.pattern.clear();
        self.visible.clear();
        tracing::debug!(category = "FOCUS", "Focus tracker destroyed");
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
