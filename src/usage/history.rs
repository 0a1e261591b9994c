//! Usage History Log

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::kv::{keys, KvStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsageSource {
    UiTap,
    NativeTap,
}

/// One raw tap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub shortcut_id: String,
    /// Milliseconds since the Unix epoch, as observed at the source
    pub timestamp: i64,
    pub source: UsageSource,
}

impl UsageRecord {
    pub fn new(shortcut_id: impl Into<String>, timestamp: i64, source: UsageSource) -> Self {
        UsageRecord {
            shortcut_id: shortcut_id.into(),
            timestamp,
            source,
        }
    }
}

/// Append-only log of taps. Entries outlive the shortcuts they refer to.
pub struct UsageHistoryLog {
    kv: KvStore,
    lock: Mutex<()>,
}

impl UsageHistoryLog {
    pub fn new(kv: KvStore) -> Self {
        UsageHistoryLog {
            kv,
            lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<Vec<UsageRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.kv.read(keys::USAGE_HISTORY)?.unwrap_or_default())
    }

    pub async fn append(&self, records: &[UsageRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut history: Vec<UsageRecord> = self.kv.read(keys::USAGE_HISTORY)?.unwrap_or_default();
        history.extend_from_slice(records);
        self.kv.write(keys::USAGE_HISTORY, &history)?;
        debug!(appended = records.len(), total = history.len(), "Usage history appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_append_preserves_order_and_source() {
        let dir = tempdir().unwrap();
        let log = UsageHistoryLog::new(KvStore::new(dir.path()));

        log.append(&[UsageRecord::new("a1", 10, UsageSource::NativeTap)])
            .await
            .unwrap();
        log.append(&[UsageRecord::new("a1", 5, UsageSource::UiTap)])
            .await
            .unwrap();

        let history = log.load().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].timestamp, 10);
        assert_eq!(history[1].source, UsageSource::UiTap);
    }

    #[tokio::test]
    async fn test_source_serializes_kebab_case() {
        let json = serde_json::to_value(UsageRecord::new("a1", 1, UsageSource::NativeTap)).unwrap();
        assert_eq!(json["source"], "native-tap");
        assert_eq!(json["shortcutId"], "a1");
    }
}
