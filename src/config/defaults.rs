//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Default root for persisted state and logs
pub const DEFAULT_DATA_DIR: &str = "~/.shortcut-kit/data";
pub const DEFAULT_LOG_DIR: &str = "~/.shortcut-kit/logs";
pub const DEFAULT_CONFIG_PATH: &str = "~/.shortcut-kit/config.json";

/// Minimum interval between two reconciliation passes.
/// Some OEM devices fire duplicate lifecycle events in rapid succession.
pub const DEFAULT_MIN_RECONCILE_INTERVAL_MS: u64 = 5000;

/// Pin verification: how long to wait for the app to come back to the foreground
pub const DEFAULT_VERIFICATION_INTERACTION_TIMEOUT_MS: u64 = 500;
/// Pin verification: settle period before querying the confirmation channel
pub const DEFAULT_VERIFICATION_SETTLE_MS: u64 = 1500;

/// Trailing window in which the file bridge reports a shortcut as recently created
pub const DEFAULT_RECENTLY_CREATED_WINDOW_MS: u64 = 10_000;

/// Bounded caches
pub const DEFAULT_LINK_METADATA_CAPACITY: usize = 200;
pub const DEFAULT_LINK_METADATA_TTL_HOURS: u64 = 24 * 7;
pub const DEFAULT_DISMISSED_CAPACITY: usize = 500;
pub const DEFAULT_DISMISSED_TTL_HOURS: u64 = 24 * 30;

/// Capacity of the change broadcast channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;
