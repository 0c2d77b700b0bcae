//! Manager and focus tracker wired together for a host application.

use std::time::Instant;

use crate::binding::{DispatchOutcome, KeyEvent};
use crate::combo::Chord;
use crate::config::{HotkeyConfig, HotkeyConfigPatch};
use crate::error::Result;
use crate::focus::{
    is_navigation_key, ElementId, FocusEvent, FocusTracker, FocusTree, ScopeMarkers,
    VisibilitySource,
};
use crate::key_adapter::KeySource;
use crate::manager::{FocusScopeHandle, FocusScopeOptions, HotkeyManager};

/// One manager plus the tracker that feeds it focus contexts.
pub struct HotkeyEngine<T: FocusTree, V: VisibilitySource> {
    manager: HotkeyManager,
    tracker: FocusTracker<T, V>,
}

impl<T: FocusTree, V: VisibilitySource> HotkeyEngine<T, V> {
    pub fn new(config: HotkeyConfig, tree: T, visibility: V, source: Box<dyn KeySource>) -> Self {
        let tracker = FocusTracker::new(tree, visibility, &config);
        Self {
            manager: HotkeyManager::with_key_source(config, source),
            tracker,
        }
    }

    pub fn manager(&self) -> &HotkeyManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut HotkeyManager {
        &mut self.manager
    }

    pub fn tracker(&self) -> &FocusTracker<T, V> {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut FocusTracker<T, V> {
        &mut self.tracker
    }

    pub fn handle_focus_event(&mut self, event: FocusEvent, now: Instant) {
        self.tracker.handle_event(event, now);
    }

    pub fn on_animation_frame(&mut self) {
        self.tracker.on_animation_frame(&mut self.manager);
    }

    pub fn advance(&mut self, now: Instant) {
        self.tracker.advance(now, &mut self.manager);
    }

    /// Dispatch a key event; bare navigation keys also reach the tracker.
    pub fn handle_key_event(&mut self, event: &mut KeyEvent, now: Instant) -> DispatchOutcome {
        if let Ok(chord) = Chord::parse(event.combo()) {
            if chord.modifiers.none() && is_navigation_key(&chord.key) {
                self.tracker.handle_event(
                    FocusEvent::KeyDown {
                        key: chord.key.clone(),
                    },
                    now,
                );
            }
        }
        self.manager.handle_key_event(event)
    }

    pub fn update_config(&mut self, patch: &HotkeyConfigPatch) -> Result<()> {
        self.manager.update_config(patch)?;
        self.tracker.update_config(self.manager.config());
        Ok(())
    }

    /// Flip dispatch on or off. Returns the new state.
    pub fn toggle_enabled(&mut self) -> Result<bool> {
        let enabled = !self.manager.config().enabled;
        self.update_config(&HotkeyConfigPatch::enabled(enabled))?;
        Ok(enabled)
    }

    /// Flip verbose logging. Returns the new state.
    pub fn toggle_debug_mode(&mut self) -> Result<bool> {
        let debug_mode = !self.manager.config().debug_mode;
        self.update_config(&HotkeyConfigPatch::debug_mode(debug_mode))?;
        Ok(debug_mode)
    }

    pub fn destroy(&mut self) {
        self.tracker.destroy();
        self.manager.destroy();
    }
}

impl<T: FocusTree + ScopeMarkers, V: VisibilitySource> HotkeyEngine<T, V> {
    pub fn mount_focus_scope(
        &mut self,
        element: ElementId,
        scope_id: &str,
        options: FocusScopeOptions,
    ) -> FocusScopeHandle {
        self.manager
            .mount_focus_scope(self.tracker.tree_mut(), element, scope_id, options)
    }

    pub fn unmount_focus_scope(&mut self, handle: FocusScopeHandle) {
        self.manager
            .unmount_focus_scope(self.tracker.tree_mut(), handle);
    }
}
