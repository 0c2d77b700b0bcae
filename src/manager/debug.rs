//! Introspection snapshots for debug tooling.

use serde::Serialize;
use std::time::Duration;

use crate::binding::ResolutionReason;
use crate::focus::FocusContext;
use crate::scope::{ResolvedHotkeys, ScopeDefinition, ScopeSummary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerformanceMetrics {
    /// Duration of the most recent reconciliation
    pub hotkey_latency: Duration,
    pub reconcile_count: u64,
    pub dispatched: u64,
    pub failed: u64,
}

/// Copy of the manager's state at one instant.
#[derive(Debug, Clone)]
pub struct HotkeyDebugInfo {
    pub active_scopes: Vec<String>,
    pub registered_hotkeys: ResolvedHotkeys,
    pub focus_context: Option<FocusContext>,
    pub performance_metrics: PerformanceMetrics,
    pub scope_hierarchy: Vec<ScopeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeySummary {
    pub combo: String,
    pub scope_id: String,
    pub priority: i32,
    pub resolution_reason: ResolutionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub hotkey_latency_us: u64,
    pub reconcile_count: u64,
    pub dispatched: u64,
    pub failed: u64,
}

/// Serializable form of `HotkeyDebugInfo`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSummary {
    pub active_scopes: Vec<String>,
    pub hotkeys: Vec<HotkeySummary>,
    pub focus_context: Option<FocusContext>,
    pub performance_metrics: MetricsSummary,
    pub scopes: Vec<ScopeSummary>,
}

impl HotkeyDebugInfo {
    pub fn summary(&self) -> DebugSummary {
        DebugSummary {
            active_scopes: self.active_scopes.clone(),
            hotkeys: self
                .registered_hotkeys
                .values()
                .map(|h| HotkeySummary {
                    combo: h.combo.clone(),
                    scope_id: h.scope_id.clone(),
                    priority: h.priority,
                    resolution_reason: h.resolution_reason,
                    description: h.description.clone(),
                    category: h.category.clone(),
                })
                .collect(),
            focus_context: self.focus_context.clone(),
            performance_metrics: MetricsSummary {
                hotkey_latency_us: self.performance_metrics.hotkey_latency.as_micros() as u64,
                reconcile_count: self.performance_metrics.reconcile_count,
                dispatched: self.performance_metrics.dispatched,
                failed: self.performance_metrics.failed,
            },
            scopes: self.scope_hierarchy.iter().map(ScopeDefinition::summary).collect(),
        }
    }
}
