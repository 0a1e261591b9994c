//! Structured JSONL logging plus human-readable stderr output.
//!
//! - **JSONL to file** (`<log_dir>/shortcut-kit.jsonl`) for later analysis
//! - **Compact to stderr** for developers
//!
//! ```rust,ignore
//! let _guard = shortcut_kit::logging::init(&config.log_dir());
//! tracing::info!(event_type = "app_start", "Application started");
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_NAME: &str = "shortcut-kit.jsonl";

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the dual-output logging system.
///
/// Returns a guard that MUST be kept alive for the duration of the program.
pub fn init(log_dir: &Path) -> LoggingGuard {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("[LOGGING] Failed to create log directory: {}", e);
    }

    let log_path = log_path(log_dir);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path);

    // Fall back to a sink so a read-only log dir never prevents startup
    let (non_blocking_file, file_guard) = match file {
        Ok(file) => tracing_appender::non_blocking(file),
        Err(e) => {
            eprintln!("[LOGGING] Failed to open log file: {}", e);
            tracing_appender::non_blocking(std::io::sink())
        }
    };

    // Default to info, allow override via RUST_LOG
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shortcut_kit=debug"));

    let json_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE);

    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    // try_init: tests and embedders may already have installed a subscriber
    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .is_ok();

    tracing::info!(
        event_type = "app_lifecycle",
        action = "started",
        subscriber_installed = installed,
        log_path = %log_path.display(),
        "Application logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

/// Get the path to the JSONL log file inside `log_dir`
pub fn log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// Log a sync pass outcome with structured fields
pub fn log_sync_pass(trigger: &str, outcome: &str, duration_ms: u64) {
    tracing::info!(
        event_type = "sync_pass",
        trigger = trigger,
        outcome = outcome,
        duration_ms = duration_ms,
        "Sync pass ({}) finished: {}", trigger, outcome
    );
}

/// Log a store mutation with structured fields
pub fn log_store_event(action: &str, shortcut_id: Option<&str>, collection_len: usize) {
    tracing::debug!(
        event_type = "store_event",
        action = action,
        shortcut_id = shortcut_id,
        collection_len = collection_len,
        "Store {}", action
    );
}
