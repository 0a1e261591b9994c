//! Sync engine facade
//!
//! Owns the store, logs, caches and protocols, and exposes the two entry
//! points the app has: user operations (create, edit, delete, tap) and
//! lifecycle hooks (cold start, foreground resume, timer tick). Every
//! lifecycle hook runs one guarded pass:
//!
//! 1. fold native taps into counters and history
//! 2. record notification IDs the user clicked as dismissed
//! 3. reconcile the collection with the home screen

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::guard::ReconcileGuard;
use super::reconcile::{ReconcileOutcome, Reconciler};
use super::verification::{PinVerifier, VerificationOutcome};
use crate::backup::BackupSnapshot;
use crate::bridge::{BridgeError, NativeBridge, PinnedShortcutUpdate};
use crate::cache::{LinkMetadata, TtlCache};
use crate::config::Config;
use crate::error::{Result, ResultExt, SyncError};
use crate::events::{ChangeBroadcast, ShortcutEvent};
use crate::kv::{keys, KvStore};
use crate::logging::{log_store_event, log_sync_pass};
use crate::shortcuts::{find_mut, Shortcut, ShortcutDraft, ShortcutPatch, ShortcutStore};
use crate::tombstones::{Tombstone, TombstoneStore};
use crate::usage::{
    compute_stats, AggregationOutcome, UsageAggregator, UsageHistoryLog, UsageRecord, UsageSource,
    UsageStats,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    ColdStart,
    FirstLaunch,
    ForegroundResume,
    TimerTick,
    Manual,
}

impl PassTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassTrigger::ColdStart => "cold_start",
            PassTrigger::FirstLaunch => "first_launch",
            PassTrigger::ForegroundResume => "foreground_resume",
            PassTrigger::TimerTick => "timer_tick",
            PassTrigger::Manual => "manual",
        }
    }
}

/// What one lifecycle pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub trigger: PassTrigger,
    /// `None` when the guard refused the pass
    pub usage: Option<AggregationOutcome>,
    pub dismissed_notifications: usize,
    pub reconcile: ReconcileOutcome,
}

impl PassReport {
    fn skipped(trigger: PassTrigger) -> Self {
        PassReport {
            trigger,
            usage: None,
            dismissed_notifications: 0,
            reconcile: ReconcileOutcome::Skipped,
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.reconcile == ReconcileOutcome::Skipped
    }
}

#[derive(Debug)]
pub struct CreatedShortcut {
    pub shortcut: Shortcut,
    /// Resolves once the pin verification protocol terminates
    pub verification: JoinHandle<VerificationOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Show a non-blocking notice asking the user to remove the icon
    pub requires_manual_removal: bool,
    /// Set when the native unpin failed; the local removal happened anyway
    pub native_error: Option<BridgeError>,
}

pub struct SyncEngine {
    store: Arc<ShortcutStore>,
    history: Arc<UsageHistoryLog>,
    tombstones: TombstoneStore,
    bridge: Arc<dyn NativeBridge>,
    guard: ReconcileGuard,
    reconciler: Reconciler,
    aggregator: UsageAggregator,
    verifier: Arc<PinVerifier>,
    dismissed: TtlCache<i64>,
    link_metadata: TtlCache<LinkMetadata>,
}

impl SyncEngine {
    /// Wire every component over one persistence area
    pub fn open(kv: KvStore, bridge: Arc<dyn NativeBridge>, config: &Config) -> Result<Self> {
        let timings = config.get_sync();
        let caches = config.get_caches();

        let store = Arc::new(
            ShortcutStore::new(kv.clone(), ChangeBroadcast::new())
                .with_widget_sync(Arc::clone(&bridge)),
        );
        let history = Arc::new(UsageHistoryLog::new(kv.clone()));
        let guard = ReconcileGuard::new(timings.min_reconcile_interval());
        let verifier = Arc::new(PinVerifier::new(Arc::clone(&bridge), &timings));

        let dismissed = TtlCache::load(
            kv.clone(),
            keys::DISMISSED_NOTIFICATIONS,
            caches.dismissed_capacity,
            caches.dismissed_ttl(),
        )?;
        let link_metadata = TtlCache::load(
            kv.clone(),
            keys::LINK_METADATA,
            caches.link_metadata_capacity,
            caches.link_metadata_ttl(),
        )?;

        info!(data_dir = %kv.dir().display(), "Sync engine opened");
        Ok(SyncEngine {
            reconciler: Reconciler::new(
                Arc::clone(&store),
                Arc::clone(&bridge),
                guard.clone(),
                Arc::clone(&verifier),
            ),
            aggregator: UsageAggregator::new(
                Arc::clone(&store),
                Arc::clone(&history),
                Arc::clone(&bridge),
            ),
            verifier,
            tombstones: TombstoneStore::new(kv),
            store,
            history,
            bridge,
            guard,
            dismissed,
            link_metadata,
        })
    }

    pub fn store(&self) -> &ShortcutStore {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShortcutEvent> {
        self.store.broadcast().subscribe()
    }

    pub fn verifier(&self) -> &Arc<PinVerifier> {
        &self.verifier
    }

    pub fn link_metadata(&self) -> &TtlCache<LinkMetadata> {
        &self.link_metadata
    }

    pub fn is_notification_dismissed(&self, notification_id: &str) -> bool {
        self.dismissed.contains(notification_id)
    }

    // ============================================
    // USER OPERATIONS
    // ============================================

    /// Persist a new shortcut, ask the OS to pin it and start verification.
    #[instrument(skip(self, draft), fields(kind = %draft.kind))]
    pub async fn create_shortcut(&self, draft: ShortcutDraft) -> Result<CreatedShortcut> {
        draft.validate()?;
        let shortcut = draft.into_shortcut(Uuid::new_v4().to_string(), now_ms());

        // Tracked before the first write so no pass can prune it mid-request
        let record = self.verifier.begin(&shortcut.id);
        let persisted = shortcut.clone();
        self.store
            .mutate(move |shortcuts| {
                shortcuts.push(persisted);
                Ok(())
            })
            .await?;
        log_store_event("create", Some(shortcut.id.as_str()), self.store.snapshot().len());

        self.bridge.request_pin_shortcut(&shortcut).await.log_err();
        let verification = self.verifier.spawn(record);

        Ok(CreatedShortcut {
            shortcut,
            verification,
        })
    }

    /// Apply an edit, then refresh the pinned icon if what it shows changed
    #[instrument(skip(self, patch))]
    pub async fn update_shortcut(&self, id: &str, patch: ShortcutPatch) -> Result<Shortcut> {
        if patch.is_empty() {
            return Err(SyncError::InvalidInput("Nothing to update".to_string()));
        }
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(SyncError::InvalidInput("Shortcut name is empty".to_string()));
        }

        let updated = self
            .store
            .mutate(|shortcuts| {
                let shortcut = find_mut(shortcuts, id)?;
                patch.apply(shortcut);
                Ok(shortcut.clone())
            })
            .await?;
        log_store_event("update", Some(id), self.store.snapshot().len());

        if patch.touches_pinned_fields() {
            self.bridge
                .update_pinned_shortcut(&PinnedShortcutUpdate::from(&updated))
                .await
                .warn_on_err();
        }
        Ok(updated)
    }

    /// Leave a tombstone, unpin (best effort) and remove locally
    #[instrument(skip(self))]
    pub async fn delete_shortcut(&self, id: &str) -> Result<DeleteOutcome> {
        if !self.store.load().await?.iter().any(|s| s.id == id) {
            return Err(SyncError::NotFound(id.to_string()));
        }

        self.tombstones.record(id, now_ms()).await?;

        let outcome = match self.bridge.disable_pinned_shortcut(id).await {
            Ok(native) => DeleteOutcome {
                requires_manual_removal: native.requires_manual_removal,
                native_error: None,
            },
            Err(e) => {
                warn!(shortcut_id = id, error = %e, "Native unpin failed, removing locally");
                DeleteOutcome {
                    requires_manual_removal: true,
                    native_error: Some(e),
                }
            }
        };

        let removed = self
            .store
            .mutate(|shortcuts| {
                shortcuts.retain(|s| s.id != id);
                Ok(())
            })
            .await;
        if let Err(e) = removed {
            self.tombstones
                .acknowledge(&[id.to_string()])
                .await
                .log_err();
            return Err(e);
        }
        log_store_event("delete", Some(id), self.store.snapshot().len());

        Ok(outcome)
    }

    /// Tap from inside the app. The history entry is written first; a
    /// counter that fails to follow can be rebuilt from it.
    pub async fn record_tap(&self, id: &str) -> Result<()> {
        if !self.store.load().await?.iter().any(|s| s.id == id) {
            return Err(SyncError::NotFound(id.to_string()));
        }

        self.history
            .append(&[UsageRecord::new(id, now_ms(), UsageSource::UiTap)])
            .await?;
        self.store
            .mutate(|shortcuts| {
                find_mut(shortcuts, id)?.record_usage(1);
                Ok(())
            })
            .await?;
        self.store.broadcast().usage_updated();
        Ok(())
    }

    pub async fn stats(&self, top_n: usize) -> Result<UsageStats> {
        let shortcuts = self.store.load().await?;
        let history = self.history.load().await?;
        Ok(compute_stats(&shortcuts, &history, chrono::Utc::now(), top_n))
    }

    pub async fn pending_tombstones(&self) -> Result<Vec<Tombstone>> {
        self.tombstones.pending().await
    }

    pub async fn acknowledge_tombstones(&self, shortcut_ids: &[String]) -> Result<usize> {
        self.tombstones.acknowledge(shortcut_ids).await
    }

    pub async fn export_backup(&self) -> Result<BackupSnapshot> {
        Ok(BackupSnapshot::new(
            self.store.load().await?,
            self.tombstones.pending().await?,
            self.history.load().await?,
            now_ms(),
        ))
    }

    // ============================================
    // LIFECYCLE
    // ============================================

    pub async fn on_cold_start(&self, first_launch: bool) -> Result<PassReport> {
        self.store.load().await?;
        if first_launch {
            self.guard.force_next();
            self.run_pass(PassTrigger::FirstLaunch).await
        } else {
            self.run_pass(PassTrigger::ColdStart).await
        }
    }

    pub async fn on_foreground_resume(&self) -> Result<PassReport> {
        self.verifier.notify_foreground();
        self.run_pass(PassTrigger::ForegroundResume).await
    }

    pub async fn on_timer_tick(&self) -> Result<PassReport> {
        self.run_pass(PassTrigger::TimerTick).await
    }

    /// One guarded pass: usage sync, notification intake, reconciliation
    #[instrument(skip(self), fields(trigger = trigger.as_str()))]
    pub async fn run_pass(&self, trigger: PassTrigger) -> Result<PassReport> {
        let Some(_permit) = self.guard.try_acquire() else {
            log_sync_pass(trigger.as_str(), "skipped", 0);
            return Ok(PassReport::skipped(trigger));
        };
        let started = Instant::now();

        let usage = self.aggregator.sync_native_usage().await?;
        let dismissed_notifications = self.intake_clicked_notifications().await;
        let reconcile = self.reconciler.reconcile_admitted().await?;

        log_sync_pass(
            trigger.as_str(),
            reconcile.label(),
            started.elapsed().as_millis() as u64,
        );
        Ok(PassReport {
            trigger,
            usage: Some(usage),
            dismissed_notifications,
            reconcile,
        })
    }

    async fn intake_clicked_notifications(&self) -> usize {
        let ids = self
            .bridge
            .get_clicked_notification_ids()
            .await
            .warn_on_err()
            .unwrap_or_default();
        if ids.is_empty() {
            return 0;
        }
        let now = now_ms();
        for id in &ids {
            self.dismissed.insert(id.clone(), now);
        }
        self.dismissed.flush().log_err();
        ids.len()
    }

    /// Write caches back; call before exit
    pub fn flush_caches(&self) -> Result<()> {
        self.dismissed.flush()?;
        self.link_metadata.flush()
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
