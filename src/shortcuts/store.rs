//! Local Store
//!
//! The persisted, ordered shortcut collection. All writers go through
//! [`ShortcutStore::mutate`], which holds an async mutex across
//! re-read, apply and atomic write, so concurrent call sites never lose an
//! update. After every successful save the change broadcast fires while the
//! lock is still held and the widget payload is pushed to the native side on
//! a detached task.

use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument, warn};

use super::types::Shortcut;
use crate::bridge::{widget_payload, NativeBridge};
use crate::error::{log_async_err, Result, SyncError};
use crate::events::ChangeBroadcast;
use crate::kv::{keys, KvStore};
use crate::logging::log_store_event;

/// Pushes the compact widget payload, skipping identical consecutive payloads
struct WidgetSync {
    bridge: Arc<dyn NativeBridge>,
    last_hash: Arc<Mutex<Option<String>>>,
}

impl WidgetSync {
    fn push(&self, shortcuts: &[Shortcut]) {
        let payload = match widget_payload(shortcuts) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize widget payload");
                return;
            }
        };
        let hash = hex::encode(Sha256::digest(payload.as_bytes()));

        {
            let mut last = self.last_hash.lock();
            if last.as_deref() == Some(hash.as_str()) {
                debug!("Widget payload unchanged, skipping sync");
                return;
            }
            *last = Some(hash.clone());
        }

        let bridge = Arc::clone(&self.bridge);
        let last_hash = Arc::clone(&self.last_hash);
        tokio::spawn(async move {
            let result = bridge.sync_widget_data(payload).await;
            if result.is_err() {
                // Allow the next save to retry the same payload
                let mut last = last_hash.lock();
                if last.as_deref() == Some(hash.as_str()) {
                    *last = None;
                }
            }
            log_async_err(result, "sync_widget_data");
        });
    }
}

pub struct ShortcutStore {
    kv: KvStore,
    write_lock: AsyncMutex<()>,
    broadcast: ChangeBroadcast,
    snapshot: RwLock<Vec<Shortcut>>,
    widget: Option<WidgetSync>,
}

impl ShortcutStore {
    pub fn new(kv: KvStore, broadcast: ChangeBroadcast) -> Self {
        ShortcutStore {
            kv,
            write_lock: AsyncMutex::new(()),
            broadcast,
            snapshot: RwLock::new(Vec::new()),
            widget: None,
        }
    }

    /// Resync the home-screen widget after every save
    pub fn with_widget_sync(mut self, bridge: Arc<dyn NativeBridge>) -> Self {
        self.widget = Some(WidgetSync {
            bridge,
            last_hash: Arc::new(Mutex::new(None)),
        });
        self
    }

    pub fn broadcast(&self) -> &ChangeBroadcast {
        &self.broadcast
    }

    /// Read the persisted collection and refresh the snapshot.
    /// A never-written store is empty.
    pub async fn load(&self) -> Result<Vec<Shortcut>> {
        let _guard = self.write_lock.lock().await;
        self.read_persisted()
    }

    /// Replace the whole collection
    pub async fn save(&self, shortcuts: Vec<Shortcut>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.persist(shortcuts, "save")
    }

    /// Locked read-modify-write.
    ///
    /// `f` runs against the freshly read collection. If it returns an error
    /// nothing is written. If it leaves the collection unchanged nothing is
    /// written and nothing is broadcast, but the snapshot is refreshed.
    #[instrument(name = "store_mutate", skip(self, f))]
    pub async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<Shortcut>) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let before = self.read_persisted()?;
        let mut after = before.clone();
        let value = f(&mut after)?;
        if after != before {
            self.persist(after, "mutate")?;
        } else {
            debug!("Mutation left collection unchanged");
        }
        Ok(value)
    }

    /// Last loaded or saved collection, without touching disk
    pub fn snapshot(&self) -> Vec<Shortcut> {
        self.snapshot.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Shortcut> {
        self.snapshot.read().iter().find(|s| s.id == id).cloned()
    }

    fn read_persisted(&self) -> Result<Vec<Shortcut>> {
        let shortcuts: Vec<Shortcut> = self.kv.read(keys::SHORTCUTS)?.unwrap_or_default();
        *self.snapshot.write() = shortcuts.clone();
        Ok(shortcuts)
    }

    /// Caller must hold `write_lock`
    fn persist(&self, shortcuts: Vec<Shortcut>, action: &str) -> Result<()> {
        if let Err(e) = self.kv.write(keys::SHORTCUTS, &shortcuts) {
            warn!(error = %e, action = action, "Failed to persist shortcuts");
            return Err(e);
        }
        log_store_event(action, None, shortcuts.len());

        *self.snapshot.write() = shortcuts.clone();
        if let Some(widget) = &self.widget {
            widget.push(&shortcuts);
        }
        self.broadcast.shortcuts_changed(shortcuts);
        Ok(())
    }
}

/// Find a shortcut by ID inside a mutation closure
pub(crate) fn find_mut<'a>(shortcuts: &'a mut [Shortcut], id: &str) -> Result<&'a mut Shortcut> {
    shortcuts
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| SyncError::NotFound(id.to_string()))
}
