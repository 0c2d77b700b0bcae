//! Focus tracking and the host UI tree seams.
//!
//! - `context` - `FocusContext` and element handles
//! - `tree` - `FocusTree`/`ScopeMarkers` traits and the in-memory `ElementTree`
//! - `visibility` - `VisibilitySource` and `StaticVisibility`
//! - `coalesce` - frame coalescing and settle timers
//! - `tracker` - `FocusTracker`

mod coalesce;
mod context;
mod tracker;
mod tree;
mod visibility;

pub use coalesce::{Coalescer, Deadline};
pub use context::{is_same_context, ElementId, ElementKind, ElementRef, FocusContext};
pub use tracker::{
    is_navigation_key, FocusEvent, FocusSink, FocusTracker, MAX_FOCUS_HISTORY,
    MAX_NAVIGATION_PATTERN, NAVIGATION_SETTLE_DELAY,
};
pub use tree::{ElementTree, FocusTree, ScopeMarkers};
pub use visibility::{ObserverKind, Rect, StaticVisibility, VisibilitySource};
