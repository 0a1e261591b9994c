//! Bounded, TTL-expiring caches persisted in the key-value area
//!
//! Used for link previews and for notification IDs the user already
//! dismissed. A cache is loaded once at startup, drops expired entries on
//! load, evicts least-recently-used entries beyond its capacity and is
//! written back explicitly with [`TtlCache::flush`].

use lru::LruCache;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::kv::KvStore;

/// Preview shown for link shortcuts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheRecord<V> {
    key: String,
    value: V,
    /// Milliseconds since the Unix epoch
    stored_at: i64,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: i64,
}

pub struct TtlCache<V> {
    kv: KvStore,
    key: &'static str,
    ttl: Duration,
    entries: Mutex<LruCache<String, Entry<V>>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Load the persisted cache, dropping expired entries
    pub fn load(kv: KvStore, key: &'static str, capacity: usize, ttl: Duration) -> Result<Self> {
        Self::load_at(kv, key, capacity, ttl, now_ms())
    }

    fn load_at(
        kv: KvStore,
        key: &'static str,
        capacity: usize,
        ttl: Duration,
        now: i64,
    ) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let mut entries = LruCache::new(capacity);

        // Persisted most-recent first; replay oldest first to keep the order
        let records: Vec<CacheRecord<V>> = match kv.read(key) {
            Ok(records) => records.unwrap_or_default(),
            Err(e @ SyncError::Serialization { .. }) => {
                warn!(cache = key, error = %e, "Cache file unreadable, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let total = records.len();
        let mut expired = 0;
        for record in records.into_iter().rev() {
            if is_expired(record.stored_at, ttl, now) {
                expired += 1;
                continue;
            }
            entries.put(
                record.key,
                Entry {
                    value: record.value,
                    stored_at: record.stored_at,
                },
            );
        }

        info!(
            cache = key,
            loaded = entries.len(),
            expired = expired,
            total = total,
            "Cache loaded"
        );
        Ok(TtlCache {
            kv,
            key,
            ttl,
            entries: Mutex::new(entries),
        })
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, now_ms())
    }

    fn get_at(&self, key: &str, now: i64) -> Option<V> {
        let mut entries = self.entries.lock();
        let stored_at = entries.get(key)?.stored_at;
        if is_expired(stored_at, self.ttl, now) {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or refresh an entry. Returns the evicted key, if any.
    pub fn insert(&self, key: impl Into<String>, value: V) -> Option<String> {
        self.insert_at(key.into(), value, now_ms())
    }

    fn insert_at(&self, key: String, value: V, now: i64) -> Option<String> {
        let mut entries = self.entries.lock();
        let evicted = entries.push(
            key.clone(),
            Entry {
                value,
                stored_at: now,
            },
        );
        match evicted {
            Some((evicted_key, _)) if evicted_key != key => {
                debug!(cache = self.key, evicted = %evicted_key, "Cache entry evicted");
                Some(evicted_key)
            }
            _ => None,
        }
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.lock().pop(key).map(|e| e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Write the cache back, most recently used first
    pub fn flush(&self) -> Result<()> {
        let records: Vec<CacheRecord<V>> = self
            .entries
            .lock()
            .iter()
            .map(|(key, entry)| CacheRecord {
                key: key.clone(),
                value: entry.value.clone(),
                stored_at: entry.stored_at,
            })
            .collect();
        self.kv.write(self.key, &records)
    }
}

fn is_expired(stored_at: i64, ttl: Duration, now: i64) -> bool {
    now.saturating_sub(stored_at) > ttl.as_millis() as i64
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_DISMISSED_CAPACITY, DEFAULT_LINK_METADATA_CAPACITY};
    use crate::kv::keys;
    use tempfile::tempdir;

    const HOUR_MS: i64 = 3_600_000;

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let dir = tempdir().unwrap();
        let cache: TtlCache<i64> = TtlCache::load(
            KvStore::new(dir.path()),
            keys::DISMISSED_NOTIFICATIONS,
            2,
            Duration::from_secs(3600),
        )
        .unwrap();

        cache.insert("n1", 1);
        cache.insert("n2", 2);
        assert_eq!(cache.get("n1"), Some(1));
        assert_eq!(cache.insert("n3", 3), Some("n2".to_string()));

        assert!(cache.contains("n1"));
        assert!(!cache.contains("n2"));
    }

    #[test]
    fn test_expired_entries_dropped_on_load() {
        let dir = tempdir().unwrap();
        let kv = KvStore::new(dir.path());
        let now = 100 * HOUR_MS;
        let ttl = Duration::from_secs(10 * 3600);

        let cache: TtlCache<LinkMetadata> =
            TtlCache::load_at(kv.clone(), keys::LINK_METADATA, 10, ttl, now).unwrap();
        cache.insert_at("old".to_string(), LinkMetadata::default(), now - 11 * HOUR_MS);
        cache.insert_at(
            "fresh".to_string(),
            LinkMetadata {
                title: Some("Docs".to_string()),
                ..Default::default()
            },
            now - HOUR_MS,
        );
        cache.flush().unwrap();

        let reloaded: TtlCache<LinkMetadata> =
            TtlCache::load_at(kv, keys::LINK_METADATA, 10, ttl, now).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.get_at("fresh", now).and_then(|m| m.title),
            Some("Docs".to_string())
        );
    }

    #[test]
    fn test_flush_preserves_recency_order() {
        let dir = tempdir().unwrap();
        let kv = KvStore::new(dir.path());
        let ttl = Duration::from_secs(3600);
        let cache: TtlCache<i64> =
            TtlCache::load(kv.clone(), keys::DISMISSED_NOTIFICATIONS, DEFAULT_DISMISSED_CAPACITY, ttl)
                .unwrap();
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.get("a");
        cache.flush().unwrap();

        let reloaded: TtlCache<i64> =
            TtlCache::load(kv, keys::DISMISSED_NOTIFICATIONS, 2, ttl).unwrap();
        // "b" is least recently used and goes first
        assert_eq!(reloaded.insert("c", 3), Some("b".to_string()));
    }

    #[test]
    fn test_corrupt_file_starts_empty_and_is_replaced_on_flush() {
        let dir = tempdir().unwrap();
        let kv = KvStore::new(dir.path());
        std::fs::write(kv.path_for(keys::LINK_METADATA), "{not json").unwrap();

        let cache: TtlCache<LinkMetadata> =
            TtlCache::load(kv.clone(), keys::LINK_METADATA, 10, Duration::from_secs(3600))
                .unwrap();
        assert!(cache.is_empty());

        cache.insert("https://example.com", LinkMetadata::default());
        cache.flush().unwrap();
        let reloaded: TtlCache<LinkMetadata> =
            TtlCache::load(kv, keys::LINK_METADATA, 10, Duration::from_secs(3600)).unwrap();
        assert!(reloaded.contains("https://example.com"));
    }

    #[test]
    fn test_get_expires_lazily() {
        let dir = tempdir().unwrap();
        let cache: TtlCache<LinkMetadata> = TtlCache::load(
            KvStore::new(dir.path()),
            keys::LINK_METADATA,
            DEFAULT_LINK_METADATA_CAPACITY,
            Duration::from_secs(3600),
        )
        .unwrap();
        cache.insert_at("x".to_string(), LinkMetadata::default(), 0);

        assert!(cache.get_at("x", 2 * HOUR_MS).is_none());
        assert!(cache.is_empty());
    }
}
