use super::*;
use crate::combo::normalize_combo;
use crate::focus::{ElementId, ElementKind, ElementRef, ElementTree, FocusTree};
use crate::key_adapter::RecordingKeySource;
use crate::scope::MergeStrategy;
use futures::executor::LocalPool;
use std::cell::{Cell, RefCell};

fn manager() -> HotkeyManager {
    HotkeyManager::new(HotkeyConfig {
        strict_scopes: true,
        ..HotkeyConfig::default()
    })
}

fn counting_handler(counter: &Rc<Cell<u32>>) -> HotkeyHandler {
    let counter = Rc::clone(counter);
    HotkeyHandler::new(move |_, _| {
        counter.set(counter.get() + 1);
        Ok(())
    })
}

fn context(path: &[&str], target_kind: ElementKind) -> FocusContext {
    let scope_id = path.last().copied().unwrap_or(GLOBAL_SCOPE);
    FocusContext::new(
        ElementRef::new(ElementId(10), ElementKind::Generic),
        ElementRef::new(ElementId(11), target_kind),
        scope_id,
        path.iter().map(|s| s.to_string()),
        0,
    )
}

fn resolved_scope(manager: &HotkeyManager, combo: &str) -> Option<String> {
    manager
        .get_active_hotkeys()
        .get(&normalize_combo(combo))
        .map(|h| h.scope_id.clone())
}

#[test]
fn test_global_scope_seeded_and_active() {
    let m = manager();
    assert!(m.scope_definition(GLOBAL_SCOPE).is_some());
    assert!(m.is_scope_active(GLOBAL_SCOPE));
    assert_eq!(m.active_scopes(), vec![GLOBAL_SCOPE.to_string()]);
}

#[test]
fn test_table_select_all_beats_global_noop() {
    let mut m = manager();
    let select_all = HotkeyHandler::new(|_, _| Ok(()));
    m.register_scope("table", ScopeDefinition::new("table", 5));
    m.register(HotkeyBinding::new("$mod+a", select_all.clone()).in_scope("table"))
        .expect("register");
    m.register(HotkeyBinding::new("$mod+a", HotkeyHandler::noop()))
        .expect("register");
    m.activate_scope("table", None);

    let resolved = m.get_active_hotkeys();
    let hotkey = resolved.get("$mod+a").expect("resolved");
    assert!(hotkey.handler.same_callback(&select_all));
    assert_eq!(hotkey.resolution_reason, crate::binding::ResolutionReason::Union);
    assert_eq!(hotkey.scope_id, "table");
}

#[test]
fn test_higher_priority_union_scope_always_wins() {
    for (high, low) in [(10, 1), (3, -4), (100, 99)] {
        let mut m = manager();
        m.register_scope("a", ScopeDefinition::new("a", high));
        m.register_scope("b", ScopeDefinition::new("b", low));
        // Register into the higher scope first and activate it last to vary the order
        m.register(HotkeyBinding::new("$mod+k", HotkeyHandler::noop()).in_scope("a"))
            .expect("register");
        m.register(HotkeyBinding::new("$mod+k", HotkeyHandler::noop()).in_scope("b"))
            .expect("register");
        m.activate_scope("b", None);
        m.activate_scope("a", None);
        assert_eq!(resolved_scope(&m, "$mod+k").as_deref(), Some("a"));
    }
}

#[test]
fn test_additive_scope_only_fills_gaps() {
    let mut m = manager();
    m.register_scope(
        "overlay",
        ScopeDefinition::new("overlay", 50).with_strategy(MergeStrategy::Additive),
    );
    m.register(HotkeyBinding::new("Escape", HotkeyHandler::noop()))
        .expect("register");
    m.register(HotkeyBinding::new("Escape", HotkeyHandler::noop()).in_scope("overlay"))
        .expect("register");
    m.register(HotkeyBinding::new("$mod+o", HotkeyHandler::noop()).in_scope("overlay"))
        .expect("register");
    m.activate_scope("overlay", None);

    assert_eq!(resolved_scope(&m, "Escape").as_deref(), Some(GLOBAL_SCOPE));
    assert_eq!(resolved_scope(&m, "$mod+o").as_deref(), Some("overlay"));
}

#[test]
fn test_deactivate_then_reactivate_is_idempotent() {
    let mut m = manager();
    m.register_scope("modal", ScopeDefinition::new("modal", 100));
    m.register(HotkeyBinding::new("$mod+s", HotkeyHandler::noop()))
        .expect("register");
    m.register(HotkeyBinding::new("$mod+s", HotkeyHandler::noop()).in_scope("modal"))
        .expect("register");
    m.register(HotkeyBinding::new("Escape", HotkeyHandler::noop()).in_scope("modal"))
        .expect("register");

    m.activate_scope("modal", None);
    let first: Vec<(String, String)> = m
        .get_active_hotkeys()
        .into_iter()
        .map(|(c, h)| (c, h.scope_id))
        .collect();

    m.deactivate_scope("modal");
    assert!(resolved_scope(&m, "Escape").is_none());
    assert_eq!(resolved_scope(&m, "$mod+s").as_deref(), Some(GLOBAL_SCOPE));

    m.activate_scope("modal", None);
    let second: Vec<(String, String)> = m
        .get_active_hotkeys()
        .into_iter()
        .map(|(c, h)| (c, h.scope_id))
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_focus_path_activates_scopes_and_deactivates_others() {
    let mut m = manager();
    for (id, priority) in [("app", 10), ("modal", 100), ("sidebar", 20)] {
        m.register_scope(id, ScopeDefinition::new(id, priority));
    }
    m.activate_scope("sidebar", None);

    m.update_focus_context(Some(context(&["global", "app", "modal"], ElementKind::Generic)));

    assert!(m.is_scope_active("global"));
    assert!(m.is_scope_active("app"));
    assert!(m.is_scope_active("modal"));
    assert!(!m.is_scope_active("sidebar"));
    assert_eq!(
        m.scope_state("modal").and_then(|s| s.context.as_ref()).map(|c| c.scope_id.as_str()),
        Some("modal")
    );
}

#[test]
fn test_clearing_focus_deactivates_everything() {
    let mut m = manager();
    m.register_scope("app", ScopeDefinition::new("app", 10));
    m.update_focus_context(Some(context(&["global", "app"], ElementKind::Generic)));

    m.update_focus_context(None);
    assert!(m.active_scopes().is_empty());
    assert!(m.focus_context().is_none());

    // The tracker-facing sink re-seeds global
    m.apply_focus_context(None);
    assert_eq!(m.active_scopes(), vec![GLOBAL_SCOPE.to_string()]);
}

#[test]
fn test_bare_letter_excluded_while_typing() {
    let mut m = manager();
    m.register(HotkeyBinding::new("a", HotkeyHandler::noop()))
        .expect("register");

    m.update_focus_context(Some(context(&["global"], ElementKind::Input)));
    assert!(!m.get_active_hotkeys().contains_key("a"));

    m.update_focus_context(Some(context(&["global"], ElementKind::Generic)));
    assert!(m.get_active_hotkeys().contains_key("a"));
}

#[test]
fn test_strict_scopes_rejects_unknown_scope() {
    let mut m = manager();
    let err = m
        .register(HotkeyBinding::new("x", HotkeyHandler::noop()).in_scope("ghost"))
        .expect_err("unknown scope");
    assert!(matches!(err, HotkeyError::UnknownScope(ref id) if id == "ghost"));
    assert_eq!(m.binding_count(), 0);
}

#[test]
fn test_lenient_binding_reattaches_when_scope_appears() {
    let mut m = HotkeyManager::new(HotkeyConfig {
        strict_scopes: false,
        ..HotkeyConfig::default()
    });
    m.register(HotkeyBinding::new("$mod+e", HotkeyHandler::noop()).in_scope("editor"))
        .expect("lenient register");
    assert!(m.get_active_hotkeys().is_empty());

    m.register_scope("editor", ScopeDefinition::new("editor", 10));
    m.activate_scope("editor", None);
    assert_eq!(resolved_scope(&m, "$mod+e").as_deref(), Some("editor"));
}

#[test]
fn test_empty_combo_is_rejected() {
    let mut m = manager();
    let err = m
        .register(HotkeyBinding::new("  ", HotkeyHandler::noop()))
        .expect_err("empty combo");
    assert!(matches!(err, HotkeyError::InvalidCombo { .. }));
}

#[test]
fn test_register_fills_event_flag_defaults() {
    let mut m = manager();
    let id = m
        .register(HotkeyBinding::new("$mod+p", HotkeyHandler::noop()).stop_propagation(true))
        .expect("register");
    let binding = m.binding(id).expect("binding");
    assert_eq!(binding.prevent_default, Some(true));
    assert_eq!(binding.stop_propagation, Some(true));
}

#[test]
fn test_unregister_restores_previous_registration() {
    let mut m = manager();
    let first_calls = Rc::new(Cell::new(0));
    let second_calls = Rc::new(Cell::new(0));
    let first = m
        .register(HotkeyBinding::new("$mod+r", counting_handler(&first_calls)))
        .expect("register");
    let second = m
        .register(HotkeyBinding::new("$mod+r", counting_handler(&second_calls)))
        .expect("register");
    assert_eq!(m.scope_state(GLOBAL_SCOPE).and_then(|s| s.owner_of("$mod+r")), Some(second));

    assert!(m.unregister(second));
    assert_eq!(m.scope_state(GLOBAL_SCOPE).and_then(|s| s.owner_of("$mod+r")), Some(first));
    assert!(m.get_active_hotkeys().contains_key("$mod+r"));

    assert!(!m.unregister(second));
    assert!(m.unregister(first));
    assert!(m.get_active_hotkeys().is_empty());
}

#[test]
fn test_unregister_older_binding_keeps_newer() {
    let mut m = manager();
    let first = m
        .register(HotkeyBinding::new("$mod+r", HotkeyHandler::noop()))
        .expect("register");
    let second = m
        .register(HotkeyBinding::new("$mod+r", HotkeyHandler::noop()))
        .expect("register");

    assert!(m.unregister(first));
    assert_eq!(m.scope_state(GLOBAL_SCOPE).and_then(|s| s.owner_of("$mod+r")), Some(second));
}

#[test]
fn test_unregister_scope_keeps_registry_bindings() {
    let mut m = manager();
    m.register_scope("table", ScopeDefinition::new("table", 5));
    m.register(HotkeyBinding::new("$mod+a", HotkeyHandler::noop()).in_scope("table"))
        .expect("register");
    m.activate_scope("table", None);

    let deactivated = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&deactivated);
    m.on(HotkeyEventKind::ScopeDeactivated, move |event| {
        sink.borrow_mut().push(event.clone());
    });

    assert!(m.unregister_scope("table"));
    assert!(!m.unregister_scope("table"));
    assert!(m.get_active_hotkeys().is_empty());
    assert_eq!(
        *deactivated.borrow(),
        vec![HotkeyEvent::ScopeDeactivated("table".to_string())]
    );
    assert_eq!(m.binding_count(), 1);

    m.register_scope("table", ScopeDefinition::new("table", 5));
    m.activate_scope("table", None);
    assert_eq!(resolved_scope(&m, "$mod+a").as_deref(), Some("table"));
}

#[test]
fn test_reregistering_scope_keeps_state() {
    let mut m = manager();
    m.register_scope("table", ScopeDefinition::new("table", 5));
    m.register(HotkeyBinding::new("$mod+a", HotkeyHandler::noop()).in_scope("table"))
        .expect("register");
    m.activate_scope("table", None);

    m.register_scope("table", ScopeDefinition::new("table", 50));
    assert!(m.is_scope_active("table"));
    assert_eq!(m.get_active_hotkeys()["$mod+a"].priority, 50);
}

#[test]
fn test_activation_condition_rejects_context() {
    let mut m = manager();
    m.register_scope(
        "grid",
        ScopeDefinition::new("grid", 10).with_condition(|ctx| !ctx.is_text_entry()),
    );

    m.activate_scope("grid", Some(&context(&["global", "grid"], ElementKind::Input)));
    assert!(!m.is_scope_active("grid"));

    m.activate_scope("grid", Some(&context(&["global", "grid"], ElementKind::Generic)));
    assert!(m.is_scope_active("grid"));

    // No context: the condition is not consulted
    m.deactivate_scope("grid");
    m.activate_scope("grid", None);
    assert!(m.is_scope_active("grid"));
}

#[test]
fn test_unknown_scope_activation_is_noop() {
    let mut m = manager();
    m.activate_scope("nowhere", None);
    assert!(!m.is_scope_active("nowhere"));
}

#[test]
fn test_update_scope_state_deactivates_on_rejected_context() {
    let mut m = manager();
    m.register_scope(
        "grid",
        ScopeDefinition::new("grid", 10).with_condition(|ctx| ctx.scope_id == "grid"),
    );
    m.activate_scope("grid", None);

    m.update_scope_state(
        "grid",
        ScopeStatePatch {
            context: Some(context(&["global", "grid"], ElementKind::Generic)),
            ..Default::default()
        },
    );
    assert!(m.is_scope_active("grid"));

    m.update_scope_state(
        "grid",
        ScopeStatePatch {
            context: Some(context(&["global", "other"], ElementKind::Generic)),
            ..Default::default()
        },
    );
    assert!(!m.is_scope_active("grid"));
}

#[test]
fn test_update_scope_condition_reevaluates() {
    let mut m = manager();
    m.register_scope("panel", ScopeDefinition::new("panel", 10));
    m.activate_scope("panel", None);

    m.update_scope_condition("panel", || true);
    assert!(m.is_scope_active("panel"));

    let open = Rc::new(Cell::new(false));
    let flag = Rc::clone(&open);
    m.update_scope_condition("panel", move || flag.get());
    assert!(!m.is_scope_active("panel"));

    // The stored condition now gates context activation
    m.activate_scope("panel", Some(&context(&["global", "panel"], ElementKind::Generic)));
    assert!(!m.is_scope_active("panel"));
    open.set(true);
    m.activate_scope("panel", Some(&context(&["global", "panel"], ElementKind::Generic)));
    assert!(m.is_scope_active("panel"));
}

#[test]
fn test_events_fire_in_order() {
    let mut m = manager();
    m.register_scope("app", ScopeDefinition::new("app", 10));
    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in [
        HotkeyEventKind::ScopeActivated,
        HotkeyEventKind::ScopeDeactivated,
        HotkeyEventKind::FocusChanged,
    ] {
        let log = Rc::clone(&log);
        m.on(kind, move |event| log.borrow_mut().push(event.kind().as_str()));
    }

    m.update_focus_context(Some(context(&["global", "app"], ElementKind::Generic)));
    m.update_focus_context(Some(context(&["global"], ElementKind::Generic)));

    assert_eq!(
        *log.borrow(),
        vec![
            "scope-activated",
            "focus-changed",
            "scope-deactivated",
            "focus-changed"
        ]
    );
}

#[test]
fn test_off_unsubscribes() {
    let mut m = manager();
    m.register_scope("app", ScopeDefinition::new("app", 10));
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    let id = m.on(HotkeyEventKind::ScopeActivated, move |_| counter.set(counter.get() + 1));

    assert!(m.off(id));
    assert!(!m.off(id));
    m.activate_scope("app", None);
    assert_eq!(hits.get(), 0);
    assert_eq!(m.listener_count(HotkeyEventKind::ScopeActivated), 0);
}

#[test]
fn test_key_event_dispatch_and_trigger_event() {
    let source = RecordingKeySource::new();
    let mut m = HotkeyManager::with_key_source(HotkeyConfig::default(), Box::new(source.clone()));
    let calls = Rc::new(Cell::new(0));
    m.register(HotkeyBinding::new("$mod+Shift+d", counting_handler(&calls)))
        .expect("register");
    assert_eq!(source.installed(), Some(vec!["$mod+shift+d".to_string()]));

    let triggered = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&triggered);
    m.on(HotkeyEventKind::HotkeyTriggered, move |event| {
        if let HotkeyEvent::HotkeyTriggered { combo, .. } = event {
            sink.borrow_mut().push(combo.clone());
        }
    });

    let mut event = KeyEvent::new("$mod+shift+d");
    assert_eq!(m.handle_key_event(&mut event), DispatchOutcome::Handled);
    assert_eq!(calls.get(), 1);
    assert!(event.is_default_prevented());
    assert!(!event.is_propagation_stopped());
    assert_eq!(*triggered.borrow(), vec!["$mod+Shift+d".to_string()]);

    let mut other = KeyEvent::new("$mod+x");
    assert_eq!(m.handle_key_event(&mut other), DispatchOutcome::Unmatched);
    assert_eq!(m.metrics().dispatched, 1);
}

#[test]
fn test_failing_handler_is_contained() {
    let mut m = manager();
    m.register(HotkeyBinding::new(
        "$mod+b",
        HotkeyHandler::new(|_, _| anyhow::bail!("broken handler")),
    ))
    .expect("register");
    m.register(HotkeyBinding::new(
        "$mod+p",
        HotkeyHandler::new(|_, _| panic!("panicking handler")),
    ))
    .expect("register");
    let calls = Rc::new(Cell::new(0));
    m.register(HotkeyBinding::new("$mod+g", counting_handler(&calls)))
        .expect("register");

    let triggered = Rc::new(Cell::new(0));
    let counter = Rc::clone(&triggered);
    m.on(HotkeyEventKind::HotkeyTriggered, move |_| counter.set(counter.get() + 1));

    assert_eq!(m.handle_key_event(&mut KeyEvent::new("$mod+b")), DispatchOutcome::Failed);
    assert_eq!(m.handle_key_event(&mut KeyEvent::new("$mod+p")), DispatchOutcome::Failed);
    assert_eq!(m.handle_key_event(&mut KeyEvent::new("$mod+g")), DispatchOutcome::Handled);
    assert_eq!(calls.get(), 1);
    assert_eq!(triggered.get(), 1);
    assert_eq!(m.metrics().failed, 2);
}

#[test]
fn test_deferred_handler_runs_on_spawner() {
    let mut pool = LocalPool::new();
    let mut m = manager();
    m.set_task_spawner(Rc::new(pool.spawner()));

    let done = Rc::new(Cell::new(false));
    let flag = Rc::clone(&done);
    m.register(HotkeyBinding::new(
        "$mod+u",
        HotkeyHandler::deferred(move |_, _| {
            let flag = Rc::clone(&flag);
            async move {
                flag.set(true);
                Ok::<(), anyhow::Error>(())
            }
        }),
    ))
    .expect("register");
    m.register(HotkeyBinding::new(
        "$mod+j",
        HotkeyHandler::deferred(|_, _| async { Err::<(), _>(anyhow::anyhow!("upload failed")) }),
    ))
    .expect("register");

    assert_eq!(m.handle_key_event(&mut KeyEvent::new("$mod+u")), DispatchOutcome::Deferred);
    assert!(!done.get());
    pool.run_until_stalled();
    assert!(done.get());

    // Rejections are logged, never propagated
    assert_eq!(m.handle_key_event(&mut KeyEvent::new("$mod+j")), DispatchOutcome::Deferred);
    pool.run_until_stalled();
}

#[test]
fn test_deferred_handler_without_spawner_fails() {
    let mut m = manager();
    m.register(HotkeyBinding::new(
        "$mod+u",
        HotkeyHandler::deferred(|_, _| async { Ok::<(), anyhow::Error>(()) }),
    ))
    .expect("register");
    assert_eq!(m.handle_key_event(&mut KeyEvent::new("$mod+u")), DispatchOutcome::Failed);
}

#[test]
fn test_disabled_config_stops_dispatch_and_resumes() {
    let source = RecordingKeySource::new();
    let mut m = HotkeyManager::with_key_source(HotkeyConfig::default(), Box::new(source.clone()));
    let calls = Rc::new(Cell::new(0));
    m.register(HotkeyBinding::new("$mod+z", counting_handler(&calls)))
        .expect("register");

    m.update_config(&HotkeyConfigPatch::enabled(false)).expect("config");
    assert_eq!(m.handle_key_event(&mut KeyEvent::new("$mod+z")), DispatchOutcome::Unmatched);
    assert_eq!(source.installed(), None);

    // Registered while disabled; picked up on re-enable
    m.register(HotkeyBinding::new("$mod+y", HotkeyHandler::noop()))
        .expect("register");
    m.update_config(&HotkeyConfigPatch::enabled(true)).expect("config");
    assert_eq!(
        source.installed(),
        Some(vec!["$mod+y".to_string(), "$mod+z".to_string()])
    );
    assert_eq!(m.handle_key_event(&mut KeyEvent::new("$mod+z")), DispatchOutcome::Handled);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_unchanged_reconcile_does_not_rebuild_subscription() {
    let mut m = manager();
    m.register_scope("app", ScopeDefinition::new("app", 10));
    m.register(HotkeyBinding::new("$mod+n", HotkeyHandler::noop()))
        .expect("register");
    let rebuilds = m.adapter().rebuild_count();

    // Scope with no bindings: activation reconciles but the resolved map is unchanged
    m.activate_scope("app", None);
    m.reconcile();
    assert_eq!(m.adapter().rebuild_count(), rebuilds);
}

#[test]
fn test_debug_info_is_a_copy() {
    let mut m = manager();
    m.register_scope("table", ScopeDefinition::new("table", 5).with_parent(GLOBAL_SCOPE));
    m.register(HotkeyBinding::new("$mod+a", HotkeyHandler::noop()).in_scope("table"))
        .expect("register");
    m.activate_scope("table", None);

    let mut info = m.get_debug_info();
    info.registered_hotkeys.clear();
    info.active_scopes.clear();
    assert_eq!(m.get_active_hotkeys().len(), 1);
    assert_eq!(m.active_scopes().len(), 2);

    let summary = m.get_debug_info().summary();
    assert_eq!(summary.hotkeys.len(), 1);
    assert_eq!(summary.scopes.len(), 2);
    assert!(summary.performance_metrics.reconcile_count > 0);
    let json = serde_json::to_value(&summary).expect("serialize");
    assert_eq!(json["hotkeys"][0]["resolutionReason"], "union");
}

#[test]
fn test_validation_includes_depth_limit() {
    let mut m = HotkeyManager::new(HotkeyConfig {
        max_scope_depth: 2,
        strict_scopes: true,
        ..HotkeyConfig::default()
    });
    m.register_scope("app", ScopeDefinition::new("app", 1).with_parent(GLOBAL_SCOPE));
    m.register_scope("pane", ScopeDefinition::new("pane", 2).with_parent("app"));
    m.register_scope("x", ScopeDefinition::new("x", 0).with_parent("y"));

    let errors = m.validate_scope_hierarchy();
    assert!(errors.iter().any(|e| e.contains("\"pane\"") && e.contains("max 2")));
    assert!(errors
        .iter()
        .any(|e| e == "Scope \"x\" references non-existent parent \"y\""));
    assert_eq!(m.scope_hierarchy("pane"), vec!["global", "app", "pane"]);
}

#[test]
fn test_conflicting_hotkeys_lists_every_claimant() {
    let mut m = manager();
    m.register_scope("table", ScopeDefinition::new("table", 5));
    m.register(HotkeyBinding::new("$mod+a", HotkeyHandler::noop()))
        .expect("register");
    m.register(HotkeyBinding::new("$mod+a", HotkeyHandler::noop()).in_scope("table"))
        .expect("register");
    m.activate_scope("table", None);

    let conflicts = m.conflicting_hotkeys();
    let claimants: Vec<&str> = conflicts["$mod+a"].iter().map(|h| h.scope_id.as_str()).collect();
    assert_eq!(claimants, vec![GLOBAL_SCOPE, "table"]);
}

#[test]
fn test_mount_and_unmount_focus_scope() {
    let mut tree = ElementTree::new();
    let root = tree.add_root(ElementKind::Generic);
    let panel = tree.add_child(root, ElementKind::Generic);
    let mut m = manager();

    let handle = m.mount_focus_scope(
        &mut tree,
        panel,
        "panel",
        FocusScopeOptions {
            inherit_from: vec![GLOBAL_SCOPE.to_string()],
            metadata: [("label".to_string(), serde_json::json!("Panel"))].into(),
            ..FocusScopeOptions::with_priority(15)
        },
    );
    assert_eq!(tree.scope_marker(panel).as_deref(), Some("panel"));
    assert_eq!(
        tree.scope_metadata(panel).and_then(|m| m.get("label")),
        Some(&serde_json::json!("Panel"))
    );
    assert!(m.is_scope_active("panel"));
    let definition = m.scope_definition("panel").expect("definition");
    assert_eq!(definition.priority, 15);
    assert_eq!(definition.hotkey_inheritance.len(), 1);

    m.unmount_focus_scope(&mut tree, handle);
    assert!(tree.scope_marker(panel).is_none());
    assert!(tree.scope_metadata(panel).is_none());
    assert!(!m.is_scope_active("panel"));
    assert!(m.scope_definition("panel").is_some());
}

#[test]
fn test_mount_without_auto_activate() {
    let mut tree = ElementTree::new();
    let root = tree.add_root(ElementKind::Generic);
    let mut m = manager();
    m.mount_focus_scope(
        &mut tree,
        root,
        "lazy",
        FocusScopeOptions {
            auto_activate: false,
            ..FocusScopeOptions::default()
        },
    );
    assert!(!m.is_scope_active("lazy"));
}

#[test]
fn test_destroy_clears_state() {
    let source = RecordingKeySource::new();
    let mut m = HotkeyManager::with_key_source(HotkeyConfig::default(), Box::new(source.clone()));
    m.register(HotkeyBinding::new("$mod+a", HotkeyHandler::noop()))
        .expect("register");

    m.destroy();
    assert_eq!(m.binding_count(), 0);
    assert!(m.active_scopes().is_empty());
    assert!(m.get_active_hotkeys().is_empty());
    assert!(m.scope_definition(GLOBAL_SCOPE).is_none());
    assert_eq!(source.installed(), None);
}

#[test]
fn test_case_variant_combo_resolves_by_priority() {
    let mut m = manager();
    let table_calls = Rc::new(Cell::new(0));
    let global_calls = Rc::new(Cell::new(0));
    m.register_scope("table", ScopeDefinition::new("table", 5));
    m.register(HotkeyBinding::new("$mod+A", counting_handler(&table_calls)).in_scope("table"))
        .expect("register");
    m.register(HotkeyBinding::new("$mod+a", counting_handler(&global_calls)))
        .expect("register");
    m.activate_scope("table", None);

    let resolved = m.get_active_hotkeys();
    assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["$mod+a"]);
    assert_eq!(resolved["$mod+a"].combo, "$mod+A");
    assert_eq!(resolved["$mod+a"].scope_id, "table");

    assert_eq!(m.handle_key_event(&mut KeyEvent::new("$mod+a")), DispatchOutcome::Handled);
    assert_eq!(table_calls.get(), 1);
    assert_eq!(global_calls.get(), 0);
}

#[test]
fn test_padded_bare_key_blocked_while_typing() {
    let mut m = manager();
    let calls = Rc::new(Cell::new(0));
    m.register(HotkeyBinding::new(" A ", counting_handler(&calls)))
        .expect("register");

    m.update_focus_context(Some(context(&[], ElementKind::Input)));
    assert!(m.get_active_hotkeys().is_empty());
    assert_eq!(m.handle_key_event(&mut KeyEvent::new("a")), DispatchOutcome::Unmatched);
    assert_eq!(calls.get(), 0);

    m.update_focus_context(Some(context(&[], ElementKind::Generic)));
    assert_eq!(m.handle_key_event(&mut KeyEvent::new("a")), DispatchOutcome::Handled);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_unregister_restores_other_spelling_of_combo() {
    let mut m = manager();
    let first = m
        .register(HotkeyBinding::new("$mod+R", HotkeyHandler::noop()))
        .expect("register");
    let second = m
        .register(HotkeyBinding::new("$mod + r", HotkeyHandler::noop()))
        .expect("register");
    assert_eq!(m.scope_state(GLOBAL_SCOPE).and_then(|s| s.owner_of("$mod+r")), Some(second));

    m.unregister(second);
    assert_eq!(m.scope_state(GLOBAL_SCOPE).and_then(|s| s.owner_of("$MOD+R")), Some(first));
    assert_eq!(m.get_active_hotkeys()["$mod+r"].combo, "$mod+R");
}

#[test]
fn test_failed_reenable_recovers_on_next_reconcile() {
    let source = RecordingKeySource::new();
    let mut m = HotkeyManager::with_key_source(HotkeyConfig::default(), Box::new(source.clone()));
    let calls = Rc::new(Cell::new(0));
    m.register(HotkeyBinding::new("$mod+a", counting_handler(&calls)))
        .expect("register");
    m.update_config(&HotkeyConfigPatch::enabled(false)).expect("disable");

    source.fail_next_install();
    assert!(m.update_config(&HotkeyConfigPatch::enabled(true)).is_err());
    assert!(!m.adapter().is_installed());

    m.reconcile();
    assert!(m.adapter().is_installed());
    assert_eq!(m.handle_key_event(&mut KeyEvent::new("$mod+a")), DispatchOutcome::Handled);
    assert_eq!(calls.get(), 1);
}
