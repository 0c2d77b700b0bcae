use super::*;
use crate::binding::{HotkeyBinding, HotkeyHandler, ResolutionReason};
use std::cell::Cell;

fn resolved(entries: &[(&str, &str)]) -> ResolvedHotkeys {
    entries
        .iter()
        .map(|(combo, scope)| {
            let binding = HotkeyBinding::new(*combo, HotkeyHandler::noop()).in_scope(*scope);
            (
                combo.to_string(),
                ResolvedHotkey::from_binding(&binding, scope, 0, ResolutionReason::Union),
            )
        })
        .collect()
}

fn adapter() -> (KeyBindingAdapter, RecordingKeySource) {
    let source = RecordingKeySource::new();
    (KeyBindingAdapter::new(Box::new(source.clone())), source)
}

#[test]
fn test_identical_map_is_a_noop() {
    let (mut adapter, source) = adapter();
    let map = resolved(&[("$mod+a", "table"), ("Escape", "global")]);

    assert!(adapter.update_bindings(&map).expect("update"));
    // Fresh handlers, same structure
    let again = resolved(&[("$mod+a", "table"), ("Escape", "global")]);
    assert!(!adapter.update_bindings(&again).expect("update"));

    assert_eq!(source.install_count(), 1);
    assert_eq!(source.uninstall_count(), 0);
    assert_eq!(adapter.rebuild_count(), 1);
}

#[test]
fn test_scope_change_rebuilds() {
    let (mut adapter, source) = adapter();
    adapter
        .update_bindings(&resolved(&[("$mod+a", "global")]))
        .expect("update");
    adapter
        .update_bindings(&resolved(&[("$mod+a", "table")]))
        .expect("update");

    assert_eq!(source.install_count(), 2);
    assert_eq!(source.uninstall_count(), 1);
}

#[test]
fn test_flag_change_rebuilds() {
    let (mut adapter, _source) = adapter();
    let mut map = resolved(&[("$mod+a", "global")]);
    adapter.update_bindings(&map).expect("update");

    if let Some(hotkey) = map.get_mut("$mod+a") {
        hotkey.prevent_default = Some(false);
    }
    assert!(adapter.update_bindings(&map).expect("update"));
}

#[test]
fn test_subscription_uses_normalized_combos_and_skips_disabled() {
    let (mut adapter, source) = adapter();
    let mut map = resolved(&[("$mod + Shift + D", "global"), ("Escape", "modal")]);
    if let Some(hotkey) = map.get_mut("Escape") {
        hotkey.disabled = true;
    }
    adapter.update_bindings(&map).expect("update");

    assert_eq!(source.installed(), Some(vec!["$mod+shift+d".to_string()]));
}

#[test]
fn test_empty_map_uninstalls() {
    let (mut adapter, source) = adapter();
    adapter
        .update_bindings(&resolved(&[("x", "global")]))
        .expect("update");
    adapter
        .update_bindings(&ResolvedHotkeys::new())
        .expect("update");

    assert!(!adapter.is_installed());
    assert_eq!(source.installed(), None);
}

#[test]
fn test_dispatch_matches_normalized_and_applies_flags() {
    let (mut adapter, _source) = adapter();
    let mut map = resolved(&[("$mod+Shift+d", "global")]);
    if let Some(hotkey) = map.get_mut("$mod+Shift+d") {
        hotkey.stop_propagation = Some(true);
    }
    adapter.update_bindings(&map).expect("update");

    let mut event = KeyEvent::new("$mod+shift+D");
    let seen = Cell::new(None);
    let outcome = adapter.dispatch(&mut event, |hotkey, _| {
        seen.set(Some(hotkey.combo.clone()));
        DispatchOutcome::Handled
    });

    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(seen.take().as_deref(), Some("$mod+Shift+d"));
    // prevent_default falls back to the adapter default (true)
    assert!(event.is_default_prevented());
    assert!(event.is_propagation_stopped());
}

#[test]
fn test_dispatch_unmatched_combo() {
    let (mut adapter, _source) = adapter();
    adapter
        .update_bindings(&resolved(&[("$mod+a", "global")]))
        .expect("update");

    let mut event = KeyEvent::new("$mod+b");
    let outcome = adapter.dispatch(&mut event, |_, _| DispatchOutcome::Handled);
    assert_eq!(outcome, DispatchOutcome::Unmatched);
    assert!(!event.is_default_prevented());
}

#[test]
fn test_dispatch_catches_panics() {
    let (mut adapter, _source) = adapter();
    adapter
        .update_bindings(&resolved(&[("$mod+a", "global")]))
        .expect("update");

    let mut event = KeyEvent::new("$mod+a");
    let outcome = adapter.dispatch(&mut event, |_, _| panic!("handler exploded"));
    assert_eq!(outcome, DispatchOutcome::Failed);
}

#[test]
fn test_disable_remembers_and_enable_reinstalls() {
    let (mut adapter, source) = adapter();
    adapter
        .update_bindings(&resolved(&[("$mod+a", "global")]))
        .expect("update");

    adapter.disable();
    assert!(!adapter.is_installed());
    assert_eq!(
        adapter.dispatch(&mut KeyEvent::new("$mod+a"), |_, _| DispatchOutcome::Handled),
        DispatchOutcome::Unmatched
    );

    adapter
        .update_bindings(&resolved(&[("$mod+b", "global")]))
        .expect("update");
    assert_eq!(source.installed(), None);

    adapter.enable().expect("enable");
    assert_eq!(source.installed(), Some(vec!["$mod+b".to_string()]));
}

#[test]
fn test_update_config_toggles_enabled() {
    let (mut adapter, source) = adapter();
    adapter
        .update_bindings(&resolved(&[("$mod+a", "global")]))
        .expect("update");

    let config = HotkeyConfig {
        enabled: false,
        ..HotkeyConfig::default()
    };
    adapter.update_config(&config).expect("config");
    assert!(!adapter.is_enabled());
    assert_eq!(source.installed(), None);

    adapter
        .update_config(&HotkeyConfig::default())
        .expect("config");
    assert!(adapter.is_installed());
}

#[test]
fn test_install_failure_is_reported_and_retried() {
    let (mut adapter, source) = adapter();
    source.fail_next_install();
    let map = resolved(&[("$mod+a", "global")]);

    let err = adapter.update_bindings(&map).expect_err("install fails");
    assert!(matches!(err, HotkeyError::KeySource(_)));
    assert!(!adapter.is_installed());

    assert!(adapter.update_bindings(&map).expect("retry"));
    assert!(adapter.is_installed());
}

#[test]
fn test_destroy_clears_everything() {
    let (mut adapter, source) = adapter();
    adapter
        .update_bindings(&resolved(&[("$mod+a", "global")]))
        .expect("update");
    adapter.destroy();

    assert!(adapter.current_bindings().is_empty());
    assert!(adapter.subscribed_combos().is_empty());
    assert_eq!(source.uninstall_count(), 1);
}

#[test]
fn test_identical_map_still_swaps_handlers() {
    let (mut adapter, _source) = adapter();
    adapter
        .update_bindings(&resolved(&[("$mod+a", "global")]))
        .expect("update");

    let mut map = resolved(&[("$mod+a", "global")]);
    if let Some(hotkey) = map.get_mut("$mod+a") {
        hotkey.description = Some("newer".to_string());
    }
    assert!(!adapter.update_bindings(&map).expect("update"));

    let mut event = KeyEvent::new("$mod+a");
    let seen = Cell::new(None);
    adapter.dispatch(&mut event, |hotkey, _| {
        seen.set(hotkey.description.clone());
        DispatchOutcome::Handled
    });
    assert_eq!(seen.take().as_deref(), Some("newer"));
}

#[test]
fn test_failed_enable_is_retried_on_next_update() {
    let (mut adapter, source) = adapter();
    let map = resolved(&[("$mod+a", "global")]);
    adapter.update_bindings(&map).expect("update");
    adapter.disable();

    source.fail_next_install();
    let err = adapter.enable().expect_err("install fails");
    assert!(matches!(err, HotkeyError::KeySource(_)));
    assert!(adapter.is_enabled());
    assert!(!adapter.is_installed());

    assert!(adapter.update_bindings(&map).expect("retry"));
    assert!(adapter.is_installed());
    assert_eq!(source.installed(), Some(vec!["$mod+a".to_string()]));
    assert_eq!(
        adapter.dispatch(&mut KeyEvent::new("$mod+a"), |_, _| DispatchOutcome::Handled),
        DispatchOutcome::Handled
    );
}
