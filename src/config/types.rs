//! Configuration type definitions
//!
//! This module contains all the struct definitions for configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;

// ============================================
// SYNC TIMINGS
// ============================================

/// Timings of the reconciliation guard, the pin verification protocol and
/// the file bridge's recently-created window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTimings {
    /// Minimum interval between reconciliation passes (default: 5000)
    #[serde(default = "default_min_reconcile_interval_ms")]
    pub min_reconcile_interval_ms: u64,
    /// Verification state A timeout (default: 500)
    #[serde(default = "default_verification_interaction_timeout_ms")]
    pub verification_interaction_timeout_ms: u64,
    /// Verification state B settle delay (default: 1500)
    #[serde(default = "default_verification_settle_ms")]
    pub verification_settle_ms: u64,
    /// Recently-created window used by the file bridge (default: 10000)
    #[serde(default = "default_recently_created_window_ms")]
    pub recently_created_window_ms: u64,
}

fn default_min_reconcile_interval_ms() -> u64 {
    DEFAULT_MIN_RECONCILE_INTERVAL_MS
}
fn default_verification_interaction_timeout_ms() -> u64 {
    DEFAULT_VERIFICATION_INTERACTION_TIMEOUT_MS
}
fn default_verification_settle_ms() -> u64 {
    DEFAULT_VERIFICATION_SETTLE_MS
}
fn default_recently_created_window_ms() -> u64 {
    DEFAULT_RECENTLY_CREATED_WINDOW_MS
}

impl Default for SyncTimings {
    fn default() -> Self {
        SyncTimings {
            min_reconcile_interval_ms: DEFAULT_MIN_RECONCILE_INTERVAL_MS,
            verification_interaction_timeout_ms: DEFAULT_VERIFICATION_INTERACTION_TIMEOUT_MS,
            verification_settle_ms: DEFAULT_VERIFICATION_SETTLE_MS,
            recently_created_window_ms: DEFAULT_RECENTLY_CREATED_WINDOW_MS,
        }
    }
}

impl SyncTimings {
    pub fn min_reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.min_reconcile_interval_ms)
    }

    pub fn verification_interaction_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_interaction_timeout_ms)
    }

    pub fn verification_settle(&self) -> Duration {
        Duration::from_millis(self.verification_settle_ms)
    }

    pub fn recently_created_window(&self) -> Duration {
        Duration::from_millis(self.recently_created_window_ms)
    }
}

// ============================================
// CACHE CONFIG
// ============================================

/// Capacity and expiry of the bounded caches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Max link metadata entries kept (default: 200)
    #[serde(default = "default_link_metadata_capacity")]
    pub link_metadata_capacity: usize,
    /// Link metadata entries older than this are dropped on load (default: 168)
    #[serde(default = "default_link_metadata_ttl_hours")]
    pub link_metadata_ttl_hours: u64,
    /// Max dismissed notification IDs kept (default: 500)
    #[serde(default = "default_dismissed_capacity")]
    pub dismissed_capacity: usize,
    /// Dismissed IDs older than this are dropped on load (default: 720)
    #[serde(default = "default_dismissed_ttl_hours")]
    pub dismissed_ttl_hours: u64,
}

fn default_link_metadata_capacity() -> usize {
    DEFAULT_LINK_METADATA_CAPACITY
}
fn default_link_metadata_ttl_hours() -> u64 {
    DEFAULT_LINK_METADATA_TTL_HOURS
}
fn default_dismissed_capacity() -> usize {
    DEFAULT_DISMISSED_CAPACITY
}
fn default_dismissed_ttl_hours() -> u64 {
    DEFAULT_DISMISSED_TTL_HOURS
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            link_metadata_capacity: DEFAULT_LINK_METADATA_CAPACITY,
            link_metadata_ttl_hours: DEFAULT_LINK_METADATA_TTL_HOURS,
            dismissed_capacity: DEFAULT_DISMISSED_CAPACITY,
            dismissed_ttl_hours: DEFAULT_DISMISSED_TTL_HOURS,
        }
    }
}

impl CacheConfig {
    pub fn link_metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.link_metadata_ttl_hours * 3600)
    }

    pub fn dismissed_ttl(&self) -> Duration {
        Duration::from_secs(self.dismissed_ttl_hours * 3600)
    }
}

// ============================================
// MAIN CONFIG
// ============================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding the key-value persistence area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Directory for JSONL logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncTimings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caches: Option<CacheConfig>,
}

impl Config {
    /// Returns the data directory with `~` expanded
    pub fn get_data_dir(&self) -> PathBuf {
        expand(self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR))
    }

    /// Returns the log directory with `~` expanded
    pub fn get_log_dir(&self) -> PathBuf {
        expand(self.log_dir.as_deref().unwrap_or(DEFAULT_LOG_DIR))
    }

    /// Returns the sync timings, or defaults if not configured
    pub fn get_sync(&self) -> SyncTimings {
        self.sync.clone().unwrap_or_default()
    }

    /// Returns the cache bounds, or defaults if not configured
    pub fn get_caches(&self) -> CacheConfig {
        self.caches.clone().unwrap_or_default()
    }
}

fn expand(path: &str) -> PathBuf {
    // No home directory (e.g. a sandboxed service account): keep state in temp
    if path.starts_with('~') && dirs::home_dir().is_none() {
        let relative = path.trim_start_matches('~').trim_start_matches('/');
        return std::env::temp_dir().join("shortcut-kit").join(relative);
    }
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
