//! Usage tracking
//!
//! - `history` - append-only tap log, never purged by reconciliation
//! - `aggregator` - folds native home-screen taps into counters and history
//! - `stats` - totals, top shortcuts and the "this month" estimate

mod aggregator;
mod history;
mod stats;

pub use aggregator::{AggregationOutcome, UsageAggregator};
pub use history::{UsageHistoryLog, UsageRecord, UsageSource};
pub use stats::{compute_stats, estimate_taps_this_month, ShortcutUsage, UsageStats};
