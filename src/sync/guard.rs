//! Reconciliation Guard
//!
//! Admits at most one pass at a time and at most one pass per minimum
//! interval. Admission stamps the start time, so a pass that runs long
//! still counts from when it began.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Default)]
struct GuardState {
    in_flight: bool,
    last_run_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct ReconcileGuard {
    min_interval: Duration,
    state: Arc<Mutex<GuardState>>,
}

/// Held for the duration of a pass. Dropping it clears the in-flight flag.
#[derive(Debug)]
pub struct GuardPermit {
    state: Arc<Mutex<GuardState>>,
}

impl Drop for GuardPermit {
    fn drop(&mut self) {
        self.state.lock().in_flight = false;
    }
}

impl ReconcileGuard {
    pub fn new(min_interval: Duration) -> Self {
        ReconcileGuard {
            min_interval,
            state: Arc::new(Mutex::new(GuardState::default())),
        }
    }

    pub fn try_acquire(&self) -> Option<GuardPermit> {
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.in_flight {
            debug!("Reconciliation already in flight");
            return None;
        }
        if let Some(last) = state.last_run_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                debug!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    min_interval_ms = self.min_interval.as_millis() as u64,
                    "Reconciliation throttled"
                );
                return None;
            }
        }
        state.in_flight = true;
        state.last_run_at = Some(now);
        Some(GuardPermit {
            state: Arc::clone(&self.state),
        })
    }

    /// Let the next `try_acquire` through regardless of the interval
    pub fn force_next(&self) {
        self.state.lock().last_run_at = None;
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }
}
