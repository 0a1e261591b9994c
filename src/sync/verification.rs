//! Pin Verification Protocol
//!
//! After a pin request the OS shows its own prompt, and the answer arrives
//! late or not at all. A record is registered before the shortcut is first
//! written, so a reconciliation pass never prunes an ID it tracks. The
//! record then walks:
//!
//! 1. `PinRequested` - until the native pin request returns
//! 2. `AwaitingInteraction` - until the app returns to the foreground or the
//!    interaction timeout elapses, whichever comes first
//! 3. `Settling` - a fixed delay so the launcher can register the icon
//! 4. `Checking` - positive confirmation first, then the pinned-ID list
//!
//! No outcome deletes anything. An unconfirmed shortcut is left for a later
//! reconciliation pass, when the recently-created window has passed.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bridge::NativeBridge;
use crate::config::SyncTimings;
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    PinRequested,
    AwaitingInteraction,
    Settling,
    Checking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Confirmed,
    /// Not pinned as far as the OS can tell
    Unconfirmed,
    /// The bridge could not answer
    Unknown,
}

impl VerificationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            VerificationOutcome::Confirmed => "confirmed",
            VerificationOutcome::Unconfirmed => "unconfirmed",
            VerificationOutcome::Unknown => "unknown",
        }
    }

    /// Whether the icon is known to be pinned. `Unknown` surfaces as
    /// [`SyncError::Ambiguous`]; the shortcut stays in the store either way.
    pub fn into_pinned(self, id: &str) -> Result<bool> {
        match self {
            VerificationOutcome::Confirmed => Ok(true),
            VerificationOutcome::Unconfirmed => Ok(false),
            VerificationOutcome::Unknown => Err(SyncError::Ambiguous(id.to_string())),
        }
    }
}

type Records = Arc<Mutex<HashMap<String, VerificationState>>>;

/// An in-flight verification. Dropping it ends tracking, including when the
/// protocol is cancelled or never started.
pub struct VerificationRecord {
    records: Records,
    id: String,
}

impl VerificationRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn advance(&self, state: VerificationState) {
        debug!(shortcut_id = %self.id, state = ?state, "Verification state");
        self.records.lock().insert(self.id.clone(), state);
    }
}

impl Drop for VerificationRecord {
    fn drop(&mut self) {
        self.records.lock().remove(&self.id);
    }
}

pub struct PinVerifier {
    bridge: Arc<dyn NativeBridge>,
    interaction_timeout: Duration,
    settle: Duration,
    foreground: Notify,
    records: Records,
}

impl PinVerifier {
    pub fn new(bridge: Arc<dyn NativeBridge>, timings: &SyncTimings) -> Self {
        PinVerifier {
            bridge,
            interaction_timeout: timings.verification_interaction_timeout(),
            settle: timings.verification_settle(),
            foreground: Notify::new(),
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start tracking `id` ahead of its pin request
    pub fn begin(&self, id: &str) -> VerificationRecord {
        self.records
            .lock()
            .insert(id.to_string(), VerificationState::PinRequested);
        VerificationRecord {
            records: Arc::clone(&self.records),
            id: id.to_string(),
        }
    }

    /// Signal that the app came back to the foreground
    pub fn notify_foreground(&self) {
        self.foreground.notify_waiters();
    }

    /// Current state of an in-progress verification
    pub fn state_of(&self, id: &str) -> Option<VerificationState> {
        self.records.lock().get(id).copied()
    }

    pub fn is_tracked(&self, id: &str) -> bool {
        self.records.lock().contains_key(id)
    }

    /// IDs with a verification in flight
    pub fn tracked_ids(&self) -> HashSet<String> {
        self.records.lock().keys().cloned().collect()
    }

    pub fn in_progress(&self) -> usize {
        self.records.lock().len()
    }

    /// Run verification on a detached task
    pub fn spawn(self: &Arc<Self>, record: VerificationRecord) -> JoinHandle<VerificationOutcome> {
        let verifier = Arc::clone(self);
        tokio::spawn(async move { verifier.run(record).await })
    }

    pub async fn verify(&self, id: &str) -> VerificationOutcome {
        self.run(self.begin(id)).await
    }

    async fn run(&self, record: VerificationRecord) -> VerificationOutcome {
        let id = record.id();
        record.advance(VerificationState::AwaitingInteraction);

        let foreground = self.foreground.notified();
        tokio::select! {
            _ = foreground => debug!(shortcut_id = id, "App returned to foreground"),
            _ = tokio::time::sleep(self.interaction_timeout) => {
                debug!(shortcut_id = id, "No foreground signal, continuing")
            }
        }

        record.advance(VerificationState::Settling);
        tokio::time::sleep(self.settle).await;

        record.advance(VerificationState::Checking);
        let outcome = self.check(id).await;
        info!(shortcut_id = id, outcome = outcome.label(), "Pin verification finished");
        outcome
    }

    async fn check(&self, id: &str) -> VerificationOutcome {
        match self.bridge.check_pin_confirmed(id).await {
            Ok(true) => return VerificationOutcome::Confirmed,
            Ok(false) => {}
            // The confirmation channel is optional; fall back to the list
            Err(e) => warn!(shortcut_id = id, error = %e, "Pin confirmation check failed"),
        }

        match self.bridge.get_pinned_shortcut_ids().await {
            Ok(pinned) if pinned.ids.contains(id) => VerificationOutcome::Confirmed,
            Ok(_) => VerificationOutcome::Unconfirmed,
            Err(e) => {
                warn!(shortcut_id = id, error = %e, "Pinned IDs unavailable during verification");
                VerificationOutcome::Unknown
            }
        }
    }
}
