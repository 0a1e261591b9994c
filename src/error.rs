use thiserror::Error;
use tracing::{error, warn};

use crate::bridge::BridgeError;

/// Error severity for UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,     // informational, never blocks
    Warning,  // recoverable, degraded to "no mutation"
    Error,    // operation failed
}

/// Domain-specific errors for the shortcut sync engine
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to persist '{key}': {source}")]
    Persistence {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Native bridge unavailable: {0}")]
    BridgeUnavailable(#[from] BridgeError),

    #[error("Pin state of shortcut {0} could not be determined")]
    Ambiguous(String),

    #[error("Shortcut not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SyncError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Persistence { .. } => ErrorSeverity::Error,
            Self::Serialization { .. } => ErrorSeverity::Error,
            Self::BridgeUnavailable(_) => ErrorSeverity::Warning,
            Self::Ambiguous(_) => ErrorSeverity::Info,
            Self::NotFound(_) => ErrorSeverity::Warning,
            Self::InvalidInput(_) => ErrorSeverity::Warning,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Persistence { .. } | Self::Serialization { .. } => {
                "Could not save your shortcuts. Please try again.".to_string()
            }
            Self::BridgeUnavailable(_) => "Home screen is not reachable right now".to_string(),
            Self::Ambiguous(_) => "Waiting for the home screen to confirm".to_string(),
            Self::NotFound(id) => format!("Shortcut {} no longer exists", id),
            Self::InvalidInput(msg) => msg.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know,
/// e.g. a best-effort native call.
///
/// ```ignore
/// use shortcut_kit::error::ResultExt;
///
/// let outcome = bridge.disable_pinned_shortcut(&id).await.warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
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
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}

/// Log an error from a detached task. Use for fire-and-forget patterns
/// such as the widget resync after a save.
pub fn log_async_err<T, E: std::fmt::Debug>(
    result: std::result::Result<T, E>,
    operation: &str,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            error!(
                error = ?err,
                operation = operation,
                "Async operation failed"
            );
            None
        }
    }
}
