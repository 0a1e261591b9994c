//! Configuration module - engine timings, storage locations and cache bounds
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (Config, SyncTimings, CacheConfig)
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::{
    DEFAULT_BROADCAST_CAPACITY, DEFAULT_MIN_RECONCILE_INTERVAL_MS,
    DEFAULT_RECENTLY_CREATED_WINDOW_MS, DEFAULT_VERIFICATION_INTERACTION_TIMEOUT_MS,
    DEFAULT_VERIFICATION_SETTLE_MS,
};

pub use types::{CacheConfig, Config, SyncTimings};

pub use loader::{load_config, load_config_from};

#[cfg(test)]
pub use defaults::{
    DEFAULT_DISMISSED_CAPACITY, DEFAULT_LINK_METADATA_CAPACITY, DEFAULT_LINK_METADATA_TTL_HOURS,
};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
