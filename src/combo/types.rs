//! Parsed combos with proper error handling and platform-aware display.
//!
//! - `Chord` - A single key chord (modifiers + key)
//! - `Modifiers` - Modifier key flags, including the `$mod` platform accelerator
//! - `ComboParseError` - Detailed parse errors for diagnostics
//! - Platform-aware display (⌘⇧K on macOS, Ctrl+Shift+K on Windows/Linux)

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when parsing a combo string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComboParseError {
    #[error("combo string is empty")]
    Empty,
    #[error("combo has no key, only modifiers")]
    MissingKey,
    #[error("combo has more than one key: '{0}'")]
    ExtraKey(String),
}

/// Modifier keys for a chord.
///
/// `platform` is the `$mod` accelerator: Command on macOS, Control elsewhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub platform: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.platform || self.ctrl || self.alt || self.shift || self.meta
    }
    pub fn none(&self) -> bool {
        !self.any()
    }
}

/// Platform enum for display formatting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Windows,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOS
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }
}

/// A parsed combo: modifier keys plus one main key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chord {
    pub key: String,
    pub modifiers: Modifiers,
}

impl Chord {
    pub fn parse(s: &str) -> Result<Self, ComboParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ComboParseError::Empty);
        }

        if s == "+" {
            return Ok(Self {
                key: "+".to_string(),
                modifiers: Modifiers::default(),
            });
        }

        // A trailing "++" (e.g. "$mod++") names the plus key itself
        let (body, mut key_part) = match s.strip_suffix("++") {
            Some(rest) => (rest, Some("+")),
            None => (s, None),
        };

        let mut modifiers = Modifiers::default();
        for part in body.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_lowercase().as_str() {
                "$mod" | "mod" => modifiers.platform = true,
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" | "opt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "meta" | "cmd" | "command" | "super" => modifiers.meta = true,
                _ => {
                    if key_part.is_some() {
                        return Err(ComboParseError::ExtraKey(part.to_string()));
                    }
                    key_part = Some(part);
                }
            }
        }

        let key = key_part.ok_or(ComboParseError::MissingKey)?;
        Ok(Self {
            key: canonicalize_key(key),
            modifiers,
        })
    }

    pub fn display(&self) -> String {
        self.display_for_platform(Platform::current())
    }

    pub fn display_for_platform(&self, platform: Platform) -> String {
        match platform {
            Platform::MacOS => self.display_macos(),
            Platform::Windows | Platform::Linux => self.display_other(),
        }
    }

    fn display_macos(&self) -> String {
        let mut s = String::new();
        if self.modifiers.ctrl {
            s.push('⌃');
        }
        if self.modifiers.alt {
            s.push('⌥');
        }
        if self.modifiers.shift {
            s.push('⇧');
        }
        if self.modifiers.platform || self.modifiers.meta {
            s.push('⌘');
        }
        s.push_str(&self.key_display());
        s
    }

    fn display_other(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.modifiers.ctrl || self.modifiers.platform {
            parts.push("Ctrl".to_string());
        }
        if self.modifiers.alt {
            parts.push("Alt".to_string());
        }
        if self.modifiers.shift {
            parts.push("Shift".to_string());
        }
        if self.modifiers.meta {
            parts.push("Super".to_string());
        }
        parts.push(self.key_display_text());
        parts.join("+")
    }

    fn key_display(&self) -> String {
        match self.key.as_str() {
            "enter" => "↵",
            "escape" => "⎋",
            "tab" => "⇥",
            "space" => "␣",
            "backspace" => "⌫",
            "delete" => "⌦",
            "up" => "↑",
            "down" => "↓",
            "left" => "←",
            "right" => "→",
            k => return k.to_uppercase(),
        }
        .to_string()
    }

    fn key_display_text(&self) -> String {
        match self.key.as_str() {
            "enter" => "Enter",
            "escape" => "Esc",
            "tab" => "Tab",
            "space" => "Space",
            "backspace" => "Backspace",
            "delete" => "Delete",
            "up" => "Up",
            "down" => "Down",
            "left" => "Left",
            "right" => "Right",
            "home" => "Home",
            "end" => "End",
            "pageup" => "PageUp",
            "pagedown" => "PageDown",
            k => return k.to_uppercase(),
        }
        .to_string()
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Canonicalize a key name to the internal standard form.
pub fn canonicalize_key(key: &str) -> String {
    let key_lower = key.to_lowercase();
    match key_lower.as_str() {
        "arrowup" => "up",
        "arrowdown" => "down",
        "arrowleft" => "left",
        "arrowright" => "right",
        "return" => "enter",
        "esc" => "escape",
        "del" => "delete",
        " " => "space",
        "pgup" => "pageup",
        "pgdn" | "pgdown" => "pagedown",
        _ => return key_lower,
    }
    .to_string()
}
