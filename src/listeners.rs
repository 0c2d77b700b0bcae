//! Listener bookkeeping shared by the manager's event bus and the focus tracker.
//!
//! Each listener is invoked inside its own `catch_unwind`, so one failing subscriber
//! never prevents the others from being notified.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle returned by subscription calls; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Ordered set of callbacks keyed by `ListenerId`.
pub struct ListenerSet<F: ?Sized> {
    entries: Vec<(ListenerId, Rc<F>)>,
}

impl<F: ?Sized> Default for ListenerSet<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> ListenerSet<F> {
    pub fn add(&mut self, listener: Rc<F>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Call every listener, isolating panics per listener.
    ///
    /// Iterates over a snapshot so listeners added or removed during
    /// notification take effect on the next round.
    pub fn notify(&self, category: &str, call: impl Fn(&F)) {
        let snapshot: Vec<Rc<F>> = self.entries.iter().map(|(_, l)| Rc::clone(l)).collect();
        for listener in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| call(&listener))) {
                tracing::error!(
                    category = category,
                    error = %panic_message(&panic),
                    "Error in listener"
                );
            }
        }
    }
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
