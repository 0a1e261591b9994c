//! Reconciliation Engine
//!
//! Removes local shortcuts the user dragged off the home screen. The native
//! answer is trusted only when it arrives; any bridge error aborts the pass
//! without touching the store. Shortcuts still in the bridge's
//! recently-created window, or with a pin verification in flight, are always
//! kept.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::guard::ReconcileGuard;
use super::verification::PinVerifier;
use crate::bridge::{BridgeError, NativeBridge};
use crate::error::Result;
use crate::shortcuts::ShortcutStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The guard refused the pass
    Skipped,
    /// The bridge could not answer; nothing changed
    Aborted(BridgeError),
    /// Nothing stored, nothing to reconcile
    Empty,
    Unchanged,
    Pruned { removed: Vec<String> },
}

impl ReconcileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Skipped => "skipped",
            ReconcileOutcome::Aborted(_) => "aborted",
            ReconcileOutcome::Empty => "empty",
            ReconcileOutcome::Unchanged => "unchanged",
            ReconcileOutcome::Pruned { .. } => "pruned",
        }
    }
}

pub struct Reconciler {
    store: Arc<ShortcutStore>,
    bridge: Arc<dyn NativeBridge>,
    guard: ReconcileGuard,
    verifier: Arc<PinVerifier>,
}

impl Reconciler {
    pub fn new(
        store: Arc<ShortcutStore>,
        bridge: Arc<dyn NativeBridge>,
        guard: ReconcileGuard,
        verifier: Arc<PinVerifier>,
    ) -> Self {
        Reconciler {
            store,
            bridge,
            guard,
            verifier,
        }
    }

    /// Run one pass if the guard admits it
    pub async fn reconcile(&self) -> Result<ReconcileOutcome> {
        let Some(_permit) = self.guard.try_acquire() else {
            return Ok(ReconcileOutcome::Skipped);
        };
        self.reconcile_admitted().await
    }

    /// Run one pass. The caller holds a guard permit.
    #[instrument(name = "reconcile", skip(self))]
    pub(crate) async fn reconcile_admitted(&self) -> Result<ReconcileOutcome> {
        // A record begun before the query may end before the store is read
        let tracked_before_query = self.verifier.tracked_ids();

        let pinned = match self.bridge.get_pinned_shortcut_ids().await {
            Ok(pinned) => pinned,
            Err(e) => {
                warn!(error = %e, code = e.code(), "Pinned IDs unavailable, aborting reconciliation");
                return Ok(ReconcileOutcome::Aborted(e));
            }
        };
        let mut keep = pinned.keep_set();
        keep.extend(tracked_before_query.iter().map(String::as_str));

        let outcome = self
            .store
            .mutate(|shortcuts| {
                if shortcuts.is_empty() {
                    return Ok(ReconcileOutcome::Empty);
                }
                let mut removed = Vec::new();
                shortcuts.retain(|s| {
                    let kept = keep.contains(s.id.as_str()) || self.verifier.is_tracked(&s.id);
                    if !kept {
                        removed.push(s.id.clone());
                    }
                    kept
                });
                if removed.is_empty() {
                    Ok(ReconcileOutcome::Unchanged)
                } else {
                    Ok(ReconcileOutcome::Pruned { removed })
                }
            })
            .await?;

        if let ReconcileOutcome::Pruned { removed } = &outcome {
            info!(removed = ?removed, "Removed shortcuts no longer on the home screen");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::fake::FakeBridge;
    use crate::events::ChangeBroadcast;
    use crate::kv::{keys, KvStore};
    use crate::config::SyncTimings;
    use crate::shortcuts::{Shortcut, ShortcutDraft, ShortcutKind};
    use crate::tombstones::TombstoneStore;
    use std::time::Duration;
    use tempfile::tempdir;

    fn shortcut(id: &str) -> Shortcut {
        ShortcutDraft::new(id, ShortcutKind::Link, "https://example.com")
            .into_shortcut(id.to_string(), 1_000)
    }

    struct Fixture {
        dir: tempfile::TempDir,
        store: Arc<ShortcutStore>,
        bridge: Arc<FakeBridge>,
        verifier: Arc<PinVerifier>,
        reconciler: Reconciler,
    }

    impl Fixture {
        fn persisted_bytes(&self) -> Vec<u8> {
            std::fs::read(KvStore::new(self.dir.path()).path_for(keys::SHORTCUTS)).unwrap()
        }
    }

    async fn fixture(ids: &[&str], min_interval_ms: u64) -> Fixture {
        let dir = tempdir().unwrap();
        let store = Arc::new(ShortcutStore::new(
            KvStore::new(dir.path()),
            ChangeBroadcast::new(),
        ));
        store
            .save(ids.iter().map(|id| shortcut(id)).collect())
            .await
            .unwrap();
        let bridge = Arc::new(FakeBridge::new());
        let verifier = Arc::new(PinVerifier::new(bridge.clone(), &SyncTimings::default()));
        let reconciler = Reconciler::new(
            store.clone(),
            bridge.clone(),
            ReconcileGuard::new(Duration::from_millis(min_interval_ms)),
            verifier.clone(),
        );
        Fixture {
            dir,
            store,
            bridge,
            verifier,
            reconciler,
        }
    }

    #[tokio::test]
    async fn test_unpinned_shortcut_is_removed_without_tombstone() {
        let f = fixture(&["a1", "a2"], 0).await;
        f.bridge.pin("a1");

        let outcome = f.reconciler.reconcile().await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Pruned {
                removed: vec!["a2".to_string()]
            }
        );
        let ids: Vec<String> = f.store.load().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a1"]);
        let tombstones = TombstoneStore::new(KvStore::new(f.dir.path()));
        assert!(tombstones.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let f = fixture(&["a1", "a2"], 0).await;
        f.bridge.pin("a1");
        f.reconciler.reconcile().await.unwrap();
        let mut rx = f.store.broadcast().subscribe();
        let before = f.persisted_bytes();

        let outcome = f.reconciler.reconcile().await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert!(rx.try_recv().is_err());
        assert_eq!(f.persisted_bytes(), before);
    }

    #[tokio::test]
    async fn test_bridge_error_leaves_store_byte_identical() {
        let f = fixture(&["a1", "a2"], 0).await;
        f.bridge.fail_with(Some(BridgeError::Exception("boom".to_string())));
        let before = f.persisted_bytes();

        let outcome = f.reconciler.reconcile().await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Aborted(BridgeError::Exception("boom".to_string()))
        );
        assert_eq!(f.persisted_bytes(), before);
    }

    #[tokio::test]
    async fn test_recently_created_shortcut_survives() {
        let f = fixture(&["a1"], 0).await;
        f.bridge.mark_recently_created("a1");

        let outcome = f.reconciler.reconcile().await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(f.store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shortcut_under_verification_is_kept() {
        let f = fixture(&["old", "fresh"], 0).await;
        let record = f.verifier.begin("fresh");

        f.reconciler.reconcile().await.unwrap();

        let ids: Vec<String> = f.store.load().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["fresh"]);

        drop(record);
        f.reconciler.reconcile().await.unwrap();
        assert!(f.store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_future_created_at_is_not_exempt() {
        let f = fixture(&[], 0).await;
        let skewed = ShortcutDraft::new("Skewed", ShortcutKind::Link, "https://example.com")
            .into_shortcut("skewed".to_string(), i64::MAX);
        f.store.save(vec![skewed]).await.unwrap();

        let outcome = f.reconciler.reconcile().await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Pruned {
                removed: vec!["skewed".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_empty_store_aborts() {
        let f = fixture(&[], 0).await;
        assert_eq!(f.reconciler.reconcile().await.unwrap(), ReconcileOutcome::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_issues_single_native_query() {
        let f = fixture(&["a1"], 5000).await;
        f.bridge.pin("a1");

        f.reconciler.reconcile().await.unwrap();
        tokio::time::advance(Duration::from_millis(3000)).await;
        let second = f.reconciler.reconcile().await.unwrap();

        assert_eq!(second, ReconcileOutcome::Skipped);
        assert_eq!(f.bridge.pinned_queries(), 1);
    }
}
