//! Structured JSONL logging plus human-readable stderr output.
//!
//! This module provides dual-output logging:
//! - **JSONL to file** (~/.hotkey-scopes/logs/hotkey-scopes.jsonl) - structured for tooling
//! - **Compact to stderr** - human-readable for developers
//!
//! # Usage
//!
//! ```rust,ignore
//! use hotkey_scopes::logging;
//!
//! // Initialize logging - MUST keep guard alive for duration of program
//! let _guard = logging::init();
//!
//! tracing::info!(category = "SCOPE", scope_id = "modal", "Scope activated");
//! ```

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::Mutex;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

// =============================================================================
// In-memory log buffer for debug tooling
// =============================================================================

static LOG_BUFFER: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();
const MAX_LOG_LINES: usize = 50;

/// Latency above which a reconciliation is reported as slow (~one 60fps frame)
const SLOW_RECONCILE_THRESHOLD: Duration = Duration::from_micros(16_666);

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the dual-output logging system.
///
/// Returns a guard that MUST be kept alive for the duration of the program.
/// If the log file cannot be opened, only the stderr layer is installed.
pub fn init() -> LoggingGuard {
    let _ = LOG_BUFFER.set(Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES)));

    let log_dir = get_log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("[LOGGING] Failed to create log directory: {}", e);
    }
    let log_path = log_dir.join("hotkey-scopes.jsonl");

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eprintln!("[LOGGING] Failed to open log file: {}", e))
        .ok();

    let (json_layer, file_guard) = match file {
        Some(file) => {
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_timer(UtcTime::new(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
                )))
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_span_events(FmtSpan::NONE);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Environment filter - default to info, allow override via RUST_LOG
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .init();

    tracing::info!(
        event_type = "app_lifecycle",
        action = "started",
        log_path = %log_path.display(),
        "Hotkey logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

/// Get the log directory path (~/.hotkey-scopes/logs/)
fn get_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".hotkey-scopes").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("hotkey-scopes-logs"))
}

/// Get the path to the JSONL log file
pub fn log_path() -> PathBuf {
    get_log_dir().join("hotkey-scopes.jsonl")
}

/// Categorized log line. Also kept in the in-memory buffer for debug tooling.
pub fn log(category: &str, message: &str) {
    add_to_buffer(category, message);
    tracing::info!(category = category, "{}", message);
}

/// Debug-level categorized log line.
pub fn log_debug(category: &str, message: &str) {
    add_to_buffer(category, message);
    tracing::debug!(category = category, "{}", message);
}

fn add_to_buffer(category: &str, message: &str) {
    if let Some(buffer) = LOG_BUFFER.get() {
        let mut buf = buffer.lock();
        if buf.len() >= MAX_LOG_LINES {
            buf.pop_front();
        }
        buf.push_back(format!("[{}] {}", category, message));
    }
}

/// Get recent log lines, oldest first
pub fn get_recent_logs() -> Vec<String> {
    LOG_BUFFER
        .get()
        .map(|buffer| buffer.lock().iter().cloned().collect())
        .unwrap_or_default()
}

// =============================================================================
// STRUCTURED LOGGING HELPERS
// =============================================================================

/// Log a scope lifecycle transition
pub fn log_scope_event(scope_id: &str, action: &str) {
    add_to_buffer("SCOPE", &format!("{} {}", action, scope_id));
    tracing::debug!(
        event_type = "scope_event",
        scope_id = scope_id,
        action = action,
        "Scope {} {}",
        action,
        scope_id
    );
}

/// Log a handler failure at the dispatch boundary
pub fn log_handler_error(combo: &str, scope_id: &str, error: &str) {
    add_to_buffer("HOTKEY", &format!("handler for {} failed: {}", combo, error));
    tracing::error!(
        event_type = "hotkey_error",
        combo = combo,
        scope_id = scope_id,
        error = error,
        "Error executing hotkey handler"
    );
}

/// Log reconciliation latency, warning when it exceeds a frame budget
pub fn log_reconcile(duration: Duration, active_scopes: usize, resolved: usize) {
    if duration > SLOW_RECONCILE_THRESHOLD {
        tracing::warn!(
            event_type = "perf",
            operation = "reconcile",
            duration_us = duration.as_micros() as u64,
            active_scopes,
            resolved,
            "Slow hotkey reconciliation"
        );
    } else {
        tracing::trace!(
            event_type = "perf",
            operation = "reconcile",
            duration_us = duration.as_micros() as u64,
            active_scopes,
            resolved,
            "Reconciled hotkeys"
        );
    }
}
