//! Scopes: definitions, runtime state and resolution.
//!
//! - `types` - `ScopeDefinition`, `ScopeState`, merge strategies and inheritance rules
//! - `resolver` - `ScopeResolver`, the pure resolution step

mod resolver;
mod types;

pub use resolver::{ResolvedHotkeys, ScopeResolver};
pub use types::{
    AllCombos, InheritanceMode, InheritanceRule, InheritedCombos, MergeStrategy,
    ScopeCondition, ScopeDefinition, ScopeState, ScopeStatePatch, ScopeSummary, GLOBAL_SCOPE,
};
