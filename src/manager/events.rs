//! Manager lifecycle events and their subscribers.

use std::collections::HashMap;
use std::rc::Rc;

use crate::focus::FocusContext;
use crate::listeners::{ListenerId, ListenerSet};

#[derive(Debug, Clone, PartialEq)]
pub enum HotkeyEvent {
    ScopeActivated(String),
    ScopeDeactivated(String),
    /// Emitted after a handler ran (or was started) successfully.
    HotkeyTriggered {
        combo: String,
        context: Option<FocusContext>,
    },
    FocusChanged(Option<FocusContext>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyEventKind {
    ScopeActivated,
    ScopeDeactivated,
    HotkeyTriggered,
    FocusChanged,
}

impl HotkeyEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HotkeyEventKind::ScopeActivated => "scope-activated",
            HotkeyEventKind::ScopeDeactivated => "scope-deactivated",
            HotkeyEventKind::HotkeyTriggered => "hotkey-triggered",
            HotkeyEventKind::FocusChanged => "focus-changed",
        }
    }
}

impl HotkeyEvent {
    pub fn kind(&self) -> HotkeyEventKind {
        match self {
            HotkeyEvent::ScopeActivated(_) => HotkeyEventKind::ScopeActivated,
            HotkeyEvent::ScopeDeactivated(_) => HotkeyEventKind::ScopeDeactivated,
            HotkeyEvent::HotkeyTriggered { .. } => HotkeyEventKind::HotkeyTriggered,
            HotkeyEvent::FocusChanged(_) => HotkeyEventKind::FocusChanged,
        }
    }
}

type EventListener = dyn Fn(&HotkeyEvent);

#[derive(Default)]
pub(crate) struct EventBus {
    listeners: HashMap<HotkeyEventKind, ListenerSet<EventListener>>,
}

impl EventBus {
    pub fn on(&mut self, kind: HotkeyEventKind, listener: Rc<EventListener>) -> ListenerId {
        self.listeners.entry(kind).or_default().add(listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.listeners.values_mut().any(|set| set.remove(id))
    }

    pub fn emit(&self, event: HotkeyEvent) {
        if let Some(set) = self.listeners.get(&event.kind()) {
            set.notify(event.kind().as_str(), |listener| listener(&event));
        }
    }

    pub fn listener_count(&self, kind: HotkeyEventKind) -> usize {
        self.listeners.get(&kind).map_or(0, ListenerSet::len)
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}
