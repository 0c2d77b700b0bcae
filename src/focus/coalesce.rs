//! Host-driven scheduling primitives.
//!
//! The engine never sleeps or spawns timers. Work is parked here and released when the
//! host calls back on its next animation frame or passes the current time in.

use std::time::{Duration, Instant};

/// Holds at most one pending task; scheduling again replaces it.
#[derive(Debug, Clone)]
pub struct Coalescer<T> {
    pending: Option<(T, Instant)>,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> Coalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is pending and park `task`. Returns true if a task was replaced.
    pub fn schedule(&mut self, task: T, now: Instant) -> bool {
        self.pending.replace((task, now)).is_some()
    }

    pub fn take(&mut self) -> Option<T> {
        self.pending.take().map(|(task, _)| task)
    }

    /// Take the task only if it has waited at least `max_wait`.
    pub fn take_if_stale(&mut self, now: Instant, max_wait: Duration) -> Option<T> {
        match &self.pending {
            Some((_, since)) if now.saturating_duration_since(*since) >= max_wait => self.take(),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref().map(|(task, _)| task)
    }
}

/// One-shot timer; re-arming moves the deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    due: Option<Instant>,
}

impl Deadline {
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.due = Some(now + delay);
    }

    /// Disarm and return true if the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }
}
