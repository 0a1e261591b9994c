//! JSON-file-backed bridge
//!
//! Stands in for the OS plugin when running the CLI on a desktop. The
//! simulated home screen lives in `<dir>/native_bridge.json`, so it can be
//! inspected and edited by hand (e.g. remove an ID from `pinned` to simulate
//! the user dragging the icon off the home screen).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    BridgeError, DisableOutcome, NativeBridge, NativeUsageEvent, PinnedShortcutIds,
    PinnedShortcutUpdate,
};
use crate::kv::KvStore;
use crate::shortcuts::Shortcut;

const BRIDGE_KEY: &str = "native_bridge";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPin {
    pub id: String,
    pub created_at: i64,
}

/// Persisted state of the simulated home screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBridgeState {
    #[serde(default)]
    pub pinned: HashSet<String>,
    #[serde(default)]
    pub recent_pins: Vec<RecentPin>,
    #[serde(default)]
    pub confirmed: HashSet<String>,
    #[serde(default)]
    pub usage_events: Vec<NativeUsageEvent>,
    #[serde(default)]
    pub clicked_notifications: Vec<String>,
    #[serde(default)]
    pub widget_payload: Option<String>,
    #[serde(default)]
    pub pinned_fields: Vec<PinnedShortcutUpdate>,
    /// Pin requests are accepted immediately, as if the user tapped "Add"
    #[serde(default = "default_auto_accept")]
    pub auto_accept_pins: bool,
    /// Simulates a launcher that cannot remove icons programmatically
    #[serde(default)]
    pub manual_removal: bool,
    /// Simulates a degraded native layer; holds the plugin error code
    /// every call reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

fn default_auto_accept() -> bool {
    true
}

impl Default for FileBridgeState {
    fn default() -> Self {
        FileBridgeState {
            pinned: HashSet::new(),
            recent_pins: Vec::new(),
            confirmed: HashSet::new(),
            usage_events: Vec::new(),
            clicked_notifications: Vec::new(),
            widget_payload: None,
            pinned_fields: Vec::new(),
            auto_accept_pins: true,
            manual_removal: false,
            unavailable: None,
        }
    }
}

pub struct FileBridge {
    kv: KvStore,
    recently_created_window: Duration,
    lock: Mutex<()>,
}

impl FileBridge {
    pub fn new(kv: KvStore, recently_created_window: Duration) -> Self {
        FileBridge {
            kv,
            recently_created_window,
            lock: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> Result<FileBridgeState, BridgeError> {
        let _guard = self.lock.lock().await;
        self.load()
    }

    /// Tap a pinned icon, as the launcher would record it
    pub async fn simulate_tap(&self, id: &str, timestamp: i64) -> Result<(), BridgeError> {
        self.update(|state| {
            state.usage_events.push(NativeUsageEvent {
                shortcut_id: id.to_string(),
                timestamp,
            });
            Ok(())
        })
        .await
    }

    /// Drag an icon off the home screen, bypassing the app
    pub async fn simulate_unpin(&self, id: &str) -> Result<(), BridgeError> {
        self.update(|state| {
            state.pinned.remove(id);
            state.confirmed.remove(id);
            state.recent_pins.retain(|pin| pin.id != id);
            Ok(())
        })
        .await
    }

    fn load(&self) -> Result<FileBridgeState, BridgeError> {
        let state = self
            .kv
            .read::<FileBridgeState>(BRIDGE_KEY)
            .map_err(|e| BridgeError::Exception(e.to_string()))?
            .unwrap_or_default();
        if let Some(code) = &state.unavailable {
            return Err(BridgeError::from_code(code, "simulated outage"));
        }
        Ok(state)
    }

    async fn update<T>(
        &self,
        f: impl FnOnce(&mut FileBridgeState) -> Result<T, BridgeError>,
    ) -> Result<T, BridgeError> {
        let _guard = self.lock.lock().await;
        let mut state = self.load()?;
        let value = f(&mut state)?;
        self.kv
            .write(BRIDGE_KEY, &state)
            .map_err(|e| BridgeError::Exception(e.to_string()))?;
        Ok(value)
    }

    fn window_start(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() - self.recently_created_window.as_millis() as i64
    }
}

#[async_trait]
impl NativeBridge for FileBridge {
    async fn get_pinned_shortcut_ids(&self) -> Result<PinnedShortcutIds, BridgeError> {
        let window_start = self.window_start();
        self.update(|state| {
            state.recent_pins.retain(|pin| pin.created_at >= window_start);
            Ok(PinnedShortcutIds {
                ids: state.pinned.clone(),
                recently_created_ids: state.recent_pins.iter().map(|pin| pin.id.clone()).collect(),
            })
        })
        .await
    }

    async fn check_pin_confirmed(&self, id: &str) -> Result<bool, BridgeError> {
        Ok(self.state().await?.confirmed.contains(id))
    }

    async fn request_pin_shortcut(&self, shortcut: &Shortcut) -> Result<(), BridgeError> {
        let created_at = chrono::Utc::now().timestamp_millis();
        self.update(|state| {
            state.recent_pins.push(RecentPin {
                id: shortcut.id.clone(),
                created_at,
            });
            state.pinned_fields.retain(|fields| fields.id != shortcut.id);
            state.pinned_fields.push(PinnedShortcutUpdate::from(shortcut));
            if state.auto_accept_pins {
                state.pinned.insert(shortcut.id.clone());
                state.confirmed.insert(shortcut.id.clone());
            }
            Ok(())
        })
        .await?;
        debug!(shortcut_id = %shortcut.id, "Pin requested on file bridge");
        Ok(())
    }

    async fn disable_pinned_shortcut(&self, id: &str) -> Result<DisableOutcome, BridgeError> {
        self.update(|state| {
            let outcome = DisableOutcome {
                requires_manual_removal: state.manual_removal,
            };
            if !state.manual_removal {
                state.pinned.remove(id);
                state.confirmed.remove(id);
            }
            state.pinned_fields.retain(|fields| fields.id != id);
            Ok(outcome)
        })
        .await
    }

    async fn update_pinned_shortcut(&self, update: &PinnedShortcutUpdate) -> Result<(), BridgeError> {
        self.update(|state| {
            if !state.pinned.contains(&update.id) {
                return Err(BridgeError::Rejected(format!("{} is not pinned", update.id)));
            }
            state.pinned_fields.retain(|fields| fields.id != update.id);
            state.pinned_fields.push(update.clone());
            Ok(())
        })
        .await
    }

    async fn get_native_usage_events(&self) -> Result<Vec<NativeUsageEvent>, BridgeError> {
        self.update(|state| Ok(std::mem::take(&mut state.usage_events)))
            .await
    }

    async fn get_clicked_notification_ids(&self) -> Result<Vec<String>, BridgeError> {
        self.update(|state| Ok(std::mem::take(&mut state.clicked_notifications)))
            .await
    }

    async fn sync_widget_data(&self, serialized_shortcuts: String) -> Result<(), BridgeError> {
        self.update(|state| {
            state.widget_payload = Some(serialized_shortcuts);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcuts::{ShortcutDraft, ShortcutKind};
    use tempfile::tempdir;

    fn bridge(dir: &std::path::Path) -> FileBridge {
        FileBridge::new(KvStore::new(dir), Duration::from_secs(10))
    }

    fn shortcut(id: &str) -> Shortcut {
        ShortcutDraft::new("Docs", ShortcutKind::Link, "https://example.com")
            .into_shortcut(id.to_string(), chrono::Utc::now().timestamp_millis())
    }

    #[tokio::test]
    async fn test_auto_accepted_pin_is_reported_and_confirmed() {
        let dir = tempdir().unwrap();
        let bridge = bridge(dir.path());

        bridge.request_pin_shortcut(&shortcut("a1")).await.unwrap();

        let pinned = bridge.get_pinned_shortcut_ids().await.unwrap();
        assert!(pinned.ids.contains("a1"));
        assert!(pinned.recently_created_ids.contains("a1"));
        assert!(bridge.check_pin_confirmed("a1").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_recent_pins_are_pruned() {
        let dir = tempdir().unwrap();
        let kv = KvStore::new(dir.path());
        let state = FileBridgeState {
            recent_pins: vec![RecentPin {
                id: "old".to_string(),
                created_at: 0,
            }],
            ..Default::default()
        };
        kv.write(BRIDGE_KEY, &state).unwrap();

        let pinned = bridge(dir.path()).get_pinned_shortcut_ids().await.unwrap();
        assert!(pinned.recently_created_ids.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_code_maps_to_bridge_error() {
        let dir = tempdir().unwrap();
        let kv = KvStore::new(dir.path());
        kv.write(
            BRIDGE_KEY,
            &FileBridgeState {
                unavailable: Some("NO_MANAGER".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let err = bridge(dir.path()).get_pinned_shortcut_ids().await.unwrap_err();
        assert_eq!(err, BridgeError::ManagerUnavailable);
    }

    #[tokio::test]
    async fn test_usage_events_are_drained() {
        let dir = tempdir().unwrap();
        let bridge = bridge(dir.path());
        bridge.simulate_tap("a1", 10).await.unwrap();
        bridge.simulate_tap("a1", 20).await.unwrap();

        assert_eq!(bridge.get_native_usage_events().await.unwrap().len(), 2);
        assert!(bridge.get_native_usage_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manual_removal_keeps_icon() {
        let dir = tempdir().unwrap();
        let bridge = bridge(dir.path());
        bridge.request_pin_shortcut(&shortcut("a1")).await.unwrap();
        bridge
            .update(|state| {
                state.manual_removal = true;
                Ok(())
            })
            .await
            .unwrap();

        let outcome = bridge.disable_pinned_shortcut("a1").await.unwrap();
        assert!(outcome.requires_manual_removal);
        assert!(bridge.state().await.unwrap().pinned.contains("a1"));
    }

    #[tokio::test]
    async fn test_update_of_unpinned_shortcut_is_rejected() {
        let dir = tempdir().unwrap();
        let bridge = bridge(dir.path());
        let update = PinnedShortcutUpdate::from(&shortcut("ghost"));
        assert!(matches!(
            bridge.update_pinned_shortcut(&update).await,
            Err(BridgeError::Rejected(_))
        ));
    }
}
