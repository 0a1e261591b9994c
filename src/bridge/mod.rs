//! Native bridge contract
//!
//! The OS plugin that owns the home screen is opaque; this module only defines
//! what the engine consumes from it. Every call is a request/response with an
//! explicit error, so callers can tell "nothing is pinned" apart from "the
//! native layer could not answer".
//!
//! - `NativeBridge` - async trait implemented by platform adapters
//! - `FileBridge` - JSON-file-backed adapter for the CLI and local runs

mod file;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::shortcuts::{Shortcut, ShortcutIcon, ShortcutKind};

pub use file::{FileBridge, FileBridgeState, RecentPin};

/// Errors reported by the native layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("host context unavailable")]
    HostUnavailable,
    #[error("shortcut manager unavailable")]
    ManagerUnavailable,
    #[error("native exception: {0}")]
    Exception(String),
    #[error("rejected by the OS: {0}")]
    Rejected(String),
}

impl BridgeError {
    /// Stable error code as reported by platform plugins
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::HostUnavailable => "HOST_UNAVAILABLE",
            BridgeError::ManagerUnavailable => "MANAGER_UNAVAILABLE",
            BridgeError::Exception(_) => "EXCEPTION",
            BridgeError::Rejected(_) => "REJECTED",
        }
    }

    /// Map a raw plugin error code back to a variant
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        match code {
            "HOST_UNAVAILABLE" | "NO_CONTEXT" => BridgeError::HostUnavailable,
            "MANAGER_UNAVAILABLE" | "NO_MANAGER" => BridgeError::ManagerUnavailable,
            "REJECTED" => BridgeError::Rejected(message.into()),
            _ => BridgeError::Exception(message.into()),
        }
    }
}

/// Answer of a pinned-ID query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedShortcutIds {
    /// Currently pinned on the home screen
    pub ids: HashSet<String>,
    /// Created within the bridge's trailing window; the OS may not report
    /// them as pinned yet
    pub recently_created_ids: HashSet<String>,
}

impl PinnedShortcutIds {
    /// IDs a reconciliation pass must keep
    pub fn keep_set(&self) -> HashSet<&str> {
        self.ids
            .iter()
            .chain(self.recently_created_ids.iter())
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisableOutcome {
    /// The launcher does not allow programmatic removal; the user has to
    /// drag the icon away themselves
    pub requires_manual_removal: bool,
}

/// A home-screen tap recorded by the native side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeUsageEvent {
    pub shortcut_id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Fields the OS renders for a pinned icon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedShortcutUpdate {
    pub id: String,
    pub name: String,
    pub kind: ShortcutKind,
    pub content_uri: String,
    pub icon: ShortcutIcon,
}

impl From<&Shortcut> for PinnedShortcutUpdate {
    fn from(shortcut: &Shortcut) -> Self {
        PinnedShortcutUpdate {
            id: shortcut.id.clone(),
            name: shortcut.name.clone(),
            kind: shortcut.kind,
            content_uri: shortcut.content_uri.clone(),
            icon: shortcut.icon.clone(),
        }
    }
}

/// Compact entry of the home-screen widget payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetShortcut {
    pub id: String,
    pub name: String,
    pub kind: ShortcutKind,
    pub icon: ShortcutIcon,
    pub usage_count: u64,
}

/// Serialize the widget payload for `sync_widget_data`
pub fn widget_payload(shortcuts: &[Shortcut]) -> serde_json::Result<String> {
    let entries: Vec<WidgetShortcut> = shortcuts
        .iter()
        .map(|s| WidgetShortcut {
            id: s.id.clone(),
            name: s.name.clone(),
            kind: s.kind,
            icon: s.icon.clone(),
            usage_count: s.usage_count,
        })
        .collect();
    serde_json::to_string(&entries)
}

/// Operations the engine needs from the OS layer.
///
/// Implementations must never mutate the local store; they are only
/// consulted and commanded.
#[async_trait]
pub trait NativeBridge: Send + Sync {
    async fn get_pinned_shortcut_ids(&self) -> Result<PinnedShortcutIds, BridgeError>;

    /// Positive confirmation channel, written by the OS pin callback
    async fn check_pin_confirmed(&self, id: &str) -> Result<bool, BridgeError>;

    /// Ask the OS to show its "add to home screen" prompt
    async fn request_pin_shortcut(&self, shortcut: &Shortcut) -> Result<(), BridgeError>;

    async fn disable_pinned_shortcut(&self, id: &str) -> Result<DisableOutcome, BridgeError>;

    async fn update_pinned_shortcut(&self, update: &PinnedShortcutUpdate) -> Result<(), BridgeError>;

    /// Drain taps recorded by the native side since the last call
    async fn get_native_usage_events(&self) -> Result<Vec<NativeUsageEvent>, BridgeError>;

    async fn get_clicked_notification_ids(&self) -> Result<Vec<String>, BridgeError>;

    async fn sync_widget_data(&self, serialized_shortcuts: String) -> Result<(), BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcuts::ShortcutDraft;

    #[test]
    fn test_keep_set_is_union() {
        let pinned = PinnedShortcutIds {
            ids: ["a".to_string(), "b".to_string()].into_iter().collect(),
            recently_created_ids: ["b".to_string(), "c".to_string()].into_iter().collect(),
        };
        let keep = pinned.keep_set();
        assert_eq!(keep.len(), 3);
        assert!(keep.contains("c"));
    }

    #[test]
    fn test_error_codes_round_trip() {
        for err in [
            BridgeError::HostUnavailable,
            BridgeError::ManagerUnavailable,
            BridgeError::Rejected("msg".to_string()),
            BridgeError::Exception("msg".to_string()),
        ] {
            assert_eq!(BridgeError::from_code(err.code(), "msg"), err);
        }
        assert_eq!(
            BridgeError::from_code("NO_CONTEXT", ""),
            BridgeError::HostUnavailable
        );
    }

    #[test]
    fn test_widget_payload_is_compact() {
        let mut shortcut = ShortcutDraft::new("Docs", ShortcutKind::Link, "https://example.com")
            .into_shortcut("a1".to_string(), 0);
        shortcut.usage_count = 4;
        let payload = widget_payload(&[shortcut]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(value[0]["id"], "a1");
        assert_eq!(value[0]["usageCount"], 4);
        assert!(value[0].get("contentUri").is_none());
    }
}
