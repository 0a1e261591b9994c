//! Usage Aggregator
//!
//! Drains taps recorded by the native side, appends them to the history log
//! with their original timestamps and applies all counter increments in a
//! single read-modify-write.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::history::{UsageHistoryLog, UsageRecord, UsageSource};
use crate::bridge::NativeBridge;
use crate::error::Result;
use crate::shortcuts::ShortcutStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationOutcome {
    /// Events appended to the history log
    pub recorded: usize,
    /// Taps applied to known shortcuts
    pub applied: u64,
    /// IDs with taps but no local shortcut
    pub unknown_ids: Vec<String>,
}

pub struct UsageAggregator {
    store: Arc<ShortcutStore>,
    history: Arc<UsageHistoryLog>,
    bridge: Arc<dyn NativeBridge>,
}

impl UsageAggregator {
    pub fn new(
        store: Arc<ShortcutStore>,
        history: Arc<UsageHistoryLog>,
        bridge: Arc<dyn NativeBridge>,
    ) -> Self {
        UsageAggregator {
            store,
            history,
            bridge,
        }
    }

    /// Fold pending native taps into history and counters.
    ///
    /// A bridge failure or an empty batch is a no-op. Persistence failures
    /// are returned.
    #[instrument(name = "sync_native_usage", skip(self))]
    pub async fn sync_native_usage(&self) -> Result<AggregationOutcome> {
        let events = match self.bridge.get_native_usage_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "Native usage events unavailable, skipping");
                return Ok(AggregationOutcome::default());
            }
        };
        if events.is_empty() {
            debug!("No native usage events");
            return Ok(AggregationOutcome::default());
        }

        let records: Vec<UsageRecord> = events
            .iter()
            .map(|e| UsageRecord::new(e.shortcut_id.clone(), e.timestamp, UsageSource::NativeTap))
            .collect();
        self.history.append(&records).await?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for event in &events {
            *counts.entry(event.shortcut_id.clone()).or_default() += 1;
        }

        let (applied, unknown_ids) = self
            .store
            .mutate(|shortcuts| {
                let mut applied = 0;
                for shortcut in shortcuts.iter_mut() {
                    if let Some(taps) = counts.remove(&shortcut.id) {
                        shortcut.record_usage(taps);
                        applied += taps;
                    }
                }
                let mut unknown: Vec<String> = counts.into_keys().collect();
                unknown.sort();
                Ok((applied, unknown))
            })
            .await?;

        if !unknown_ids.is_empty() {
            debug!(unknown = ?unknown_ids, "Taps for shortcuts not in the local store");
        }
        self.store.broadcast().usage_updated();

        info!(recorded = records.len(), applied = applied, "Native usage synced");
        Ok(AggregationOutcome {
            recorded: records.len(),
            applied,
            unknown_ids,
        })
    }
}
