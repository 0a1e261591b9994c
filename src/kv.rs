//! Local key-value persistence area
//!
//! Each key maps to one JSON document `<dir>/<key>.json`. Writes are atomic
//! (write temp + rename) so a crash mid-write never leaves a torn collection.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::{Result, SyncError};

/// Fixed keys of the persisted collections
pub mod keys {
    pub const SHORTCUTS: &str = "shortcuts";
    pub const USAGE_HISTORY: &str = "usage_history";
    pub const TOMBSTONES: &str = "deleted_shortcuts";
    pub const DISMISSED_NOTIFICATIONS: &str = "dismissed_notifications";
    pub const LINK_METADATA: &str = "link_metadata";
}

#[derive(Debug, Clone)]
pub struct KvStore {
    dir: PathBuf,
}

impl KvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        KvStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Read and parse a document. Returns `None` if the key was never written.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.read_raw(key)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| SyncError::Serialization {
                key: key.to_string(),
                source,
            })
    }

    /// Read the raw bytes of a document
    pub fn read_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SyncError::Persistence {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Serialize and atomically replace a document
    #[instrument(name = "kv_write", skip(self, value))]
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_vec(value).map_err(|source| SyncError::Serialization {
            key: key.to_string(),
            source,
        })?;

        let persistence = |source: std::io::Error| SyncError::Persistence {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(persistence)?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &json).map_err(persistence)?;
        // Atomic on Unix; best-effort on Windows
        fs::rename(&temp_path, &path).map_err(persistence)?;

        debug!(key = key, bytes = json.len(), "Wrote document (atomic)");
        Ok(())
    }
}
