//! Durable snapshot storage.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use tasas_common::{RateSnapshot, Result, TasasError};

/// Default key under which the snapshot is cached.
pub const DEFAULT_CACHE_KEY: &str = "monitor_rates_v16";

/// Repository for the last published snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Load the cached snapshot, if any.
    fn get(&self) -> Option<RateSnapshot>;

    /// Persist `snapshot`, replacing whatever was stored.
    fn put(&self, snapshot: &RateSnapshot) -> Result<()>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: RwLock<Option<RateSnapshot>>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `snapshot`.
    pub fn with_snapshot(snapshot: RateSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self) -> Option<RateSnapshot> {
        self.snapshot.read().clone()
    }

    fn put(&self, snapshot: &RateSnapshot) -> Result<()> {
        *self.snapshot.write() = Some(snapshot.clone());
        Ok(())
    }
}

/// Store that keeps the snapshot as JSON in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store for `key` inside `dir`.
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", key)),
        }
    }

    /// File backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn get(&self) -> Option<RateSnapshot> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!(path = %self.path.display(), "No cached snapshot");
                return None;
            }
        };

        // A corrupt cache behaves like an empty one.
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable snapshot cache");
                None
            }
        }
    }

    fn put(&self, snapshot: &RateSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path).map_err(|e| TasasError::Storage(e.to_string()))?;

        debug!(path = %self.path.display(), "Snapshot persisted");
        Ok(())
    }
}
