//! Shortcut Kit - keeps a locally persisted shortcut collection eventually
//! consistent with the OS home screen it does not control.
//!
//! The home screen is the source of truth for what is pinned, but it answers
//! late, sometimes not at all, and never tells the app when the user drags an
//! icon away. The engine therefore only ever removes a shortcut after a
//! successful native answer that no longer lists it, and never while it is
//! still in the bridge's recently-created window.

pub mod backup;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod kv;
pub mod logging;
pub mod shortcuts;
pub mod sync;
pub mod tombstones;
pub mod usage;

pub use error::{Result, SyncError};
pub use sync::SyncEngine;
