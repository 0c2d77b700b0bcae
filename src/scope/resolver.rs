//! Scope resolution: active scopes + per-scope tables + focus → one handler per combo.
//!
//! Resolution is a pure function of its inputs. Scopes are ordered parents-first and then
//! by ascending priority, so a later UNION scope with a strictly higher effective priority
//! replaces what an earlier one recorded, while an ADDITIVE scope only fills gaps.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::types::{MergeStrategy, ScopeDefinition, ScopeState};
use crate::binding::{HotkeyBinding, ResolutionReason, ResolvedHotkey};
use crate::combo::{is_input_conflict, normalize_combo};
use crate::focus::FocusContext;

/// Resolved map keyed by normalized combo. Each entry keeps the combo as registered.
pub type ResolvedHotkeys = BTreeMap<String, ResolvedHotkey>;

#[derive(Debug, Default)]
pub struct ScopeResolver {
    definitions: BTreeMap<String, ScopeDefinition>,
}

impl ScopeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    /// Insert or replace a definition. Returns the replaced one.
    pub fn register_scope(&mut self, definition: ScopeDefinition) -> Option<ScopeDefinition> {
        self.definitions.insert(definition.id.clone(), definition)
    }

    pub fn unregister_scope(&mut self, scope_id: &str) -> Option<ScopeDefinition> {
        self.definitions.remove(scope_id)
    }

    pub fn definition(&self, scope_id: &str) -> Option<&ScopeDefinition> {
        self.definitions.get(scope_id)
    }

    pub fn definition_mut(&mut self, scope_id: &str) -> Option<&mut ScopeDefinition> {
        self.definitions.get_mut(scope_id)
    }

    /// All definitions, ordered by id.
    pub fn definitions(&self) -> impl Iterator<Item = &ScopeDefinition> {
        self.definitions.values()
    }

    pub fn contains(&self, scope_id: &str) -> bool {
        self.definitions.contains_key(scope_id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn clear(&mut self) {
        self.definitions.clear();
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    pub fn resolve_active_hotkeys(
        &self,
        active_scopes: &[&ScopeDefinition],
        scope_states: &HashMap<String, ScopeState>,
        focus_context: Option<&FocusContext>,
    ) -> ResolvedHotkeys {
        let mut resolved = ResolvedHotkeys::new();

        for scope in resolution_order(active_scopes) {
            let Some(state) = scope_states.get(&scope.id).filter(|s| s.active) else {
                continue;
            };
            if state.hotkeys.is_empty() {
                continue;
            }
            match scope.strategy {
                MergeStrategy::Union => merge_union(&mut resolved, state.hotkeys.values(), scope),
                MergeStrategy::Additive => {
                    merge_additive(&mut resolved, state.hotkeys.values(), scope)
                }
            }
        }

        resolved.retain(|_, hotkey| !self.should_disable(hotkey, focus_context));
        resolved
    }

    fn should_disable(&self, hotkey: &ResolvedHotkey, focus_context: Option<&FocusContext>) -> bool {
        if hotkey.disabled {
            return true;
        }

        let Some(context) = focus_context else {
            return false;
        };

        if let Some(scope) = self.definitions.get(&hotkey.scope_id) {
            if !scope.accepts(context) {
                return true;
            }
        }

        context.is_text_entry() && is_input_conflict(&hotkey.combo)
    }

    /// Every binding that took part in merging, before conflicts were settled or filtering applied.
    pub fn candidate_hotkeys(
        &self,
        active_scopes: &[&ScopeDefinition],
        scope_states: &HashMap<String, ScopeState>,
    ) -> Vec<ResolvedHotkey> {
        let mut candidates = Vec::new();
        for scope in resolution_order(active_scopes) {
            let Some(state) = scope_states.get(&scope.id).filter(|s| s.active) else {
                continue;
            };
            let reason = reason_for(scope.strategy);
            let mut bindings: Vec<&HotkeyBinding> = state.hotkeys.values().collect();
            bindings.sort_by(|a, b| a.combo.cmp(&b.combo));
            candidates.extend(
                bindings
                    .into_iter()
                    .map(|b| ResolvedHotkey::from_binding(b, &scope.id, scope.priority, reason)),
            );
        }
        candidates
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Root-first chain of parent ids ending in `scope_id`.
    pub fn scope_hierarchy(&self, scope_id: &str) -> Vec<String> {
        let mut hierarchy: Vec<String> = Vec::new();
        let mut current = Some(scope_id.to_string());

        while let Some(id) = current {
            if hierarchy.contains(&id) {
                break;
            }
            current = self
                .definitions
                .get(&id)
                .and_then(|scope| scope.parent_id.clone());
            hierarchy.push(id);
        }

        hierarchy.reverse();
        hierarchy
    }

    /// Combos claimed by more than one distinct scope.
    pub fn conflicting_hotkeys<'a>(
        hotkeys: impl IntoIterator<Item = &'a ResolvedHotkey>,
    ) -> BTreeMap<String, Vec<ResolvedHotkey>> {
        let mut by_combo: BTreeMap<String, Vec<ResolvedHotkey>> = BTreeMap::new();
        for hotkey in hotkeys {
            by_combo
                .entry(normalize_combo(&hotkey.combo))
                .or_default()
                .push(hotkey.clone());
        }

        by_combo.retain(|_, group| {
            let scopes: HashSet<&str> = group.iter().map(|h| h.scope_id.as_str()).collect();
            group.len() > 1 && scopes.len() > 1
        });
        by_combo
    }

    /// Cycles, dangling parents and unknown inheritance sources, one message each.
    pub fn validate_scope_hierarchy(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for scope in self.definitions.values() {
            let mut visited: Vec<&str> = Vec::new();
            let mut current = Some(scope.id.as_str());
            while let Some(id) = current {
                if visited.contains(&id) {
                    errors.push(format!(
                        "Circular dependency detected in scope hierarchy: {} -> {}",
                        visited.join(" -> "),
                        id
                    ));
                    break;
                }
                visited.push(id);
                current = self
                    .definitions
                    .get(id)
                    .and_then(|s| s.parent_id.as_deref());
            }

            if let Some(parent) = &scope.parent_id {
                if !self.definitions.contains_key(parent) {
                    errors.push(format!(
                        "Scope \"{}\" references non-existent parent \"{}\"",
                        scope.id, parent
                    ));
                }
            }

            for rule in &scope.hotkey_inheritance {
                if !self.definitions.contains_key(&rule.from_scope) {
                    errors.push(format!(
                        "Scope \"{}\" has inheritance rule from non-existent scope \"{}\"",
                        scope.id, rule.from_scope
                    ));
                }
            }
        }

        errors
    }
}

fn reason_for(strategy: MergeStrategy) -> ResolutionReason {
    match strategy {
        MergeStrategy::Union => ResolutionReason::Union,
        MergeStrategy::Additive => ResolutionReason::Additive,
    }
}

/// Parents before children, then stable by ascending priority.
fn resolution_order<'a>(scopes: &[&'a ScopeDefinition]) -> Vec<&'a ScopeDefinition> {
    let by_id: HashMap<&str, &'a ScopeDefinition> =
        scopes.iter().map(|s| (s.id.as_str(), *s)).collect();
    let mut visited = HashSet::new();
    let mut ordered = Vec::with_capacity(scopes.len());

    for &scope in scopes {
        visit(scope, &by_id, &mut visited, &mut ordered);
    }

    ordered.sort_by_key(|scope| scope.priority);
    ordered
}

fn visit<'a>(
    scope: &'a ScopeDefinition,
    by_id: &HashMap<&str, &'a ScopeDefinition>,
    visited: &mut HashSet<&'a str>,
    ordered: &mut Vec<&'a ScopeDefinition>,
) {
    if !visited.insert(scope.id.as_str()) {
        return;
    }
    if let Some(parent) = scope.parent_id.as_deref().and_then(|id| by_id.get(id).copied()) {
        visit(parent, by_id, visited, ordered);
    }
    ordered.push(scope);
}

fn merge_union<'a>(
    resolved: &mut ResolvedHotkeys,
    incoming: impl Iterator<Item = &'a HotkeyBinding>,
    scope: &ScopeDefinition,
) {
    for binding in incoming {
        let key = normalize_combo(&binding.combo);
        let priority = binding.effective_priority(scope.priority);
        let replace = resolved
            .get(&key)
            .map_or(true, |existing| priority > existing.priority);
        if replace {
            resolved.insert(
                key,
                ResolvedHotkey::from_binding(binding, &scope.id, scope.priority, ResolutionReason::Union),
            );
        }
    }
}

fn merge_additive<'a>(
    resolved: &mut ResolvedHotkeys,
    incoming: impl Iterator<Item = &'a HotkeyBinding>,
    scope: &ScopeDefinition,
) {
    for binding in incoming {
        resolved.entry(normalize_combo(&binding.combo)).or_insert_with(|| {
            ResolvedHotkey::from_binding(binding, &scope.id, scope.priority, ResolutionReason::Additive)
        });
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
