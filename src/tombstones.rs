//! Deletion records for the cloud-sync collaborator
//!
//! Only explicit user deletion writes a tombstone. Shortcuts pruned by
//! reconciliation were removed on the home screen, which is device-local,
//! and must not propagate as deletions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::kv::{keys, KvStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    pub shortcut_id: String,
    /// Milliseconds since the Unix epoch
    pub deleted_at: i64,
}

pub struct TombstoneStore {
    kv: KvStore,
    lock: Mutex<()>,
}

impl TombstoneStore {
    pub fn new(kv: KvStore) -> Self {
        TombstoneStore {
            kv,
            lock: Mutex::new(()),
        }
    }

    /// Record a deletion. A repeated deletion of the same ID keeps the
    /// latest timestamp.
    pub async fn record(&self, shortcut_id: &str, deleted_at: i64) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tombstones = self.read()?;
        tombstones.retain(|t| t.shortcut_id != shortcut_id);
        tombstones.push(Tombstone {
            shortcut_id: shortcut_id.to_string(),
            deleted_at,
        });
        self.kv.write(keys::TOMBSTONES, &tombstones)?;
        debug!(shortcut_id = shortcut_id, "Tombstone recorded");
        Ok(())
    }

    /// Deletions not yet propagated
    pub async fn pending(&self) -> Result<Vec<Tombstone>> {
        let _guard = self.lock.lock().await;
        self.read()
    }

    /// Drop tombstones the collaborator has propagated
    pub async fn acknowledge(&self, shortcut_ids: &[String]) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let acked: HashSet<&str> = shortcut_ids.iter().map(String::as_str).collect();
        let mut tombstones = self.read()?;
        let before = tombstones.len();
        tombstones.retain(|t| !acked.contains(t.shortcut_id.as_str()));
        let removed = before - tombstones.len();
        if removed > 0 {
            self.kv.write(keys::TOMBSTONES, &tombstones)?;
        }
        Ok(removed)
    }

    fn read(&self) -> Result<Vec<Tombstone>> {
        Ok(self.kv.read(keys::TOMBSTONES)?.unwrap_or_default())
    }
}
