use thiserror::Error;
use tracing::{error, warn};

/// Domain-specific errors for the hotkey engine
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Scope '{0}' not found")]
    UnknownScope(String),

    #[error("Invalid combo '{combo}': {reason}")]
    InvalidCombo { combo: String, reason: String },

    #[error("Key source failed: {0}")]
    KeySource(String),

    #[error("Failed to read config '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Scenario error: {0}")]
    Scenario(String),
}

impl HotkeyError {
    /// Whether the error comes from caller misconfiguration rather than the environment.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            Self::UnknownScope(_) | Self::InvalidCombo { .. } | Self::Scenario(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HotkeyError>;

/// Extension trait for ergonomic error logging
pub trait ResultExt<T> {
    fn log_err(self) -> Option<T>;
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?e,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?e,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation warning"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_scope_message() {
        let err = HotkeyError::UnknownScope("modal".to_string());
        assert_eq!(err.to_string(), "Scope 'modal' not found");
        assert!(err.is_misconfiguration());
    }

    #[test]
    fn test_log_err_passes_through_ok() {
        let ok: std::result::Result<u8, String> = Ok(3);
        assert_eq!(ok.log_err(), Some(3));
        let err: std::result::Result<u8, String> = Err("boom".into());
        assert_eq!(err.warn_on_err(), None);
    }
}
