use regex::Regex;
use smallvec::SmallVec;
use std::sync::LazyLock;

/// Patterns that collide with ordinary typing when a text-entry element has focus.
static INPUT_CONFLICTS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // Letter or digit without modifiers
        Regex::new(r"^[a-z0-9]$").expect("valid regex"),
        // Space without modifiers
        Regex::new(r"^space$").expect("valid regex"),
        // Common editing keys
        Regex::new(r"^(?:backspace|delete|enter|tab)$").expect("valid regex"),
    ]
});

/// Normalize a combo for matching: lower-case, whitespace stripped, parts re-joined with `+`.
///
/// `"$mod + Shift + D"` and `"$MOD+shift+d"` both become `"$mod+shift+d"`.
pub fn normalize_combo(combo: &str) -> String {
    let lowered: String = combo
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    let parts: SmallVec<[&str; 4]> = lowered.split('+').map(str::trim).collect();
    parts.join("+")
}

/// True if the combo would hijack normal typing: a bare ASCII letter or digit, Space,
/// or one of Backspace/Delete/Enter/Tab with no modifiers. Checked on the normalized form.
pub fn is_input_conflict(combo: &str) -> bool {
    let normalized = normalize_combo(combo);
    INPUT_CONFLICTS
        .iter()
        .any(|pattern| pattern.is_match(&normalized))
}
