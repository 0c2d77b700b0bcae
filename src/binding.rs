//! Hotkey bindings, handlers and resolved entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::focus::FocusContext;
use crate::scope::GLOBAL_SCOPE;

/// Future returned by a deferred handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;

/// Fire-and-forget task handed to a `TaskSpawner`.
pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// Runs deferred handler futures on the host's single-threaded executor.
pub trait TaskSpawner {
    fn spawn(&self, task: LocalTask) -> anyhow::Result<()>;
}

impl TaskSpawner for futures::executor::LocalSpawner {
    fn spawn(&self, task: LocalTask) -> anyhow::Result<()> {
        futures::task::LocalSpawnExt::spawn_local(self, task)
            .map_err(|e| anyhow::anyhow!("executor rejected task: {e}"))
    }
}

/// Result of offering a key event to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchOutcome {
    /// No resolved hotkey for the combo, or dispatch is disabled.
    Unmatched,
    Handled,
    /// A deferred handler was started; its result is logged when it completes.
    Deferred,
    /// The handler returned an error or panicked.
    Failed,
}

impl DispatchOutcome {
    pub fn is_match(self) -> bool {
        !matches!(self, DispatchOutcome::Unmatched)
    }
}

type ImmediateFn = dyn Fn(&KeyEvent, Option<&FocusContext>) -> anyhow::Result<()>;
type DeferredFn = dyn Fn(&KeyEvent, Option<&FocusContext>) -> HandlerFuture;

/// Callback invoked when a resolved combo is pressed.
///
/// `Deferred` handlers are started but never awaited by the dispatcher; the future is
/// handed to the manager's `TaskSpawner`.
#[derive(Clone)]
pub enum HotkeyHandler {
    Immediate(Rc<ImmediateFn>),
    Deferred(Rc<DeferredFn>),
}

impl HotkeyHandler {
    pub fn new(
        handler: impl Fn(&KeyEvent, Option<&FocusContext>) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self::Immediate(Rc::new(handler))
    }

    pub fn deferred<F, Fut>(handler: F) -> Self
    where
        F: Fn(&KeyEvent, Option<&FocusContext>) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        Self::Deferred(Rc::new(
            move |event: &KeyEvent, context: Option<&FocusContext>| -> HandlerFuture {
                Box::pin(handler(event, context))
            },
        ))
    }

    /// Handler that does nothing; useful for claiming a combo so lower scopes can't.
    pub fn noop() -> Self {
        Self::new(|_, _| Ok(()))
    }

    /// True if both handles point at the same callback.
    pub fn same_callback(&self, other: &HotkeyHandler) -> bool {
        match (self, other) {
            (Self::Immediate(a), Self::Immediate(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            (Self::Deferred(a), Self::Deferred(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for HotkeyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(_) => f.write_str("HotkeyHandler::Immediate"),
            Self::Deferred(_) => f.write_str("HotkeyHandler::Deferred"),
        }
    }
}

/// A key event as delivered by the key source, already translated to a combo string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    combo: String,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl KeyEvent {
    pub fn new(combo: impl Into<String>) -> Self {
        Self {
            combo: combo.into(),
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn combo(&self) -> &str {
        &self.combo
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Identifier returned by `HotkeyManager::register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub(crate) u64);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hotkey_{}", self.0)
    }
}

/// A (combo, handler, scope) registration before resolution.
#[derive(Clone, Debug)]
pub struct HotkeyBinding {
    pub combo: String,
    pub handler: HotkeyHandler,
    pub scope_id: String,
    /// Falls back to the owning scope's priority when unset.
    pub priority: Option<i32>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub disabled: bool,
    pub prevent_default: Option<bool>,
    pub stop_propagation: Option<bool>,
}

impl HotkeyBinding {
    /// New binding in the global scope.
    pub fn new(combo: impl Into<String>, handler: HotkeyHandler) -> Self {
        Self {
            combo: combo.into(),
            handler,
            scope_id: GLOBAL_SCOPE.to_string(),
            priority: None,
            description: None,
            category: None,
            disabled: false,
            prevent_default: None,
            stop_propagation: None,
        }
    }

    pub fn in_scope(mut self, scope_id: impl Into<String>) -> Self {
        self.scope_id = scope_id.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn prevent_default(mut self, prevent: bool) -> Self {
        self.prevent_default = Some(prevent);
        self
    }

    pub fn stop_propagation(mut self, stop: bool) -> Self {
        self.stop_propagation = Some(stop);
        self
    }

    /// Priority used when merging: the binding's own, else the scope's.
    pub fn effective_priority(&self, scope_priority: i32) -> i32 {
        self.priority.unwrap_or(scope_priority)
    }
}

/// Which merge strategy produced a resolved entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionReason {
    Union,
    Additive,
}

/// The single winning binding for a combo after merge and filtering.
#[derive(Clone, Debug)]
pub struct ResolvedHotkey {
    pub combo: String,
    pub handler: HotkeyHandler,
    pub scope_id: String,
    pub priority: i32,
    pub resolution_reason: ResolutionReason,
    pub disabled: bool,
    pub prevent_default: Option<bool>,
    pub stop_propagation: Option<bool>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub original_binding: HotkeyBinding,
}

impl ResolvedHotkey {
    pub fn from_binding(
        binding: &HotkeyBinding,
        scope_id: &str,
        scope_priority: i32,
        resolution_reason: ResolutionReason,
    ) -> Self {
        Self {
            combo: binding.combo.clone(),
            handler: binding.handler.clone(),
            scope_id: scope_id.to_string(),
            priority: binding.effective_priority(scope_priority),
            resolution_reason,
            disabled: binding.disabled,
            prevent_default: binding.prevent_default,
            stop_propagation: binding.stop_propagation,
            description: binding.description.clone(),
            category: binding.category.clone(),
            original_binding: binding.clone(),
        }
    }

    /// Structural equality on the fields that affect the low-level subscription.
    pub fn same_subscription(&self, other: &ResolvedHotkey) -> bool {
        self.combo == other.combo
            && self.scope_id == other.scope_id
            && self.disabled == other.disabled
            && self.prevent_default == other.prevent_default
            && self.stop_propagation == other.stop_propagation
    }
}
