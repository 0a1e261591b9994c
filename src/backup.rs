//! Backup snapshot handed to the cloud-sync collaborator
//!
//! The transport is not part of this crate. A snapshot bundles everything the
//! collaborator needs to propagate: the collection, pending tombstones and
//! the raw usage history.

use serde::{Deserialize, Serialize};

use crate::shortcuts::Shortcut;
use crate::tombstones::Tombstone;
use crate::usage::UsageRecord;

pub const BACKUP_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub version: u32,
    /// Milliseconds since the Unix epoch
    pub exported_at: i64,
    pub shortcuts: Vec<Shortcut>,
    #[serde(default)]
    pub tombstones: Vec<Tombstone>,
    #[serde(default)]
    pub history: Vec<UsageRecord>,
}

impl BackupSnapshot {
    pub fn new(
        shortcuts: Vec<Shortcut>,
        tombstones: Vec<Tombstone>,
        history: Vec<UsageRecord>,
        exported_at: i64,
    ) -> Self {
        BackupSnapshot {
            version: BACKUP_FORMAT_VERSION,
            exported_at,
            shortcuts,
            tombstones,
            history,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Shortcut IDs present in this snapshot that a tombstone marks deleted
    pub fn tombstoned_ids(&self) -> Vec<&str> {
        self.shortcuts
            .iter()
            .filter(|s| self.tombstones.iter().any(|t| t.shortcut_id == s.id))
            .map(|s| s.id.as_str())
            .collect()
    }
}
