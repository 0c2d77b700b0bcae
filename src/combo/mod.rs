//! Combo strings: normalization, parsing and display.
//!
//! A combo is the string a binding is registered under, e.g. `"$mod+Shift+d"` or
//! `"Escape"`. Scope tables and the resolved map are keyed by the normalized form, so
//! `"$mod+A"` and `"$mod + a"` name the same combo; entries keep the spelling they were
//! registered under for display.
//!
//! - `normalize` - canonical matching form and the text-entry conflict check
//! - `types` - `Chord` parsing and platform-aware display

mod normalize;
mod types;

pub use normalize::{is_input_conflict, normalize_combo};
pub use types::{canonicalize_key, Chord, ComboParseError, Modifiers, Platform};

#[cfg(test)]
#[path = "combo_tests.rs"]
mod tests;
