//! TTL-bounded cache of resolved team identifiers
//!
//! Maps (team number, program) to the identifier and payload a previous
//! lookup resolved, so repeated lookups skip the network across app
//! restarts. The whole table mirrors to one persisted JSON blob: writes
//! are fire-and-forget background tasks, reads never touch storage, and
//! expired entries are purged lazily on the read that finds them stale.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::storage::Storage;

/// Storage key the serialized table lives under.
pub const STORAGE_KEY: &str = "team_resolution_cache";

/// Default entry lifetime. Team numbers map to ids effectively forever,
/// but a bounded window keeps renamed or re-registered teams from pinning
/// stale payloads.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One resolved team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub team_id: i64,
    pub payload: Value,
    /// Unix timestamp in milliseconds (absolute, not a delta).
    pub cached_at: u64,
}

struct CacheInner {
    storage: Arc<dyn Storage>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// Serializes persist tasks so an earlier task cannot clobber a later
    /// snapshot; each task snapshots the live table under this lock.
    writer: tokio::sync::Mutex<()>,
}

/// Cheaply clonable handle; clones share one table and one writer queue.
#[derive(Clone)]
pub struct TeamCache {
    inner: Arc<CacheInner>,
}

impl TeamCache {
    pub fn new(storage: Arc<dyn Storage>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                storage,
                ttl,
                entries: Mutex::new(HashMap::new()),
                writer: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Load the persisted blob into memory. Called once at startup; an
    /// absent or corrupt blob is an empty cache, never an error.
    pub async fn initialize(&self) {
        let blob = match self.inner.storage.get_item(STORAGE_KEY).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("no persisted team cache");
                return;
            }
            Err(e) => {
                warn!(error = %e, "failed to read persisted team cache, starting empty");
                return;
            }
        };
        match serde_json::from_str::<HashMap<String, CacheEntry>>(&blob) {
            Ok(entries) => {
                info!(entries = entries.len(), "team cache loaded");
                *self.lock_entries() = entries;
            }
            Err(e) => {
                warn!(error = %e, "corrupt team cache blob, starting empty");
            }
        }
    }

    /// Look up a previously resolved team.
    ///
    /// A stale entry is removed from memory, a blob rewrite is scheduled,
    /// and the lookup reports a miss.
    pub fn get(&self, number: &str, program: &str) -> Option<CacheEntry> {
        let key = cache_key(number, program);
        let now = now_millis();
        let ttl_ms = self.inner.ttl.as_millis() as u64;

        let mut entries = self.lock_entries();
        if let Some(entry) = entries.get(&key) {
            if now.saturating_sub(entry.cached_at) < ttl_ms {
                return Some(entry.clone());
            }
        } else {
            return None;
        }
        entries.remove(&key);
        drop(entries);

        debug!(team = %key, "expired cache entry purged");
        self.schedule_persist();
        None
    }

    /// Insert or refresh a resolution and schedule a blob rewrite.
    pub fn put(&self, number: &str, program: &str, team_id: i64, payload: Value) {
        let key = cache_key(number, program);
        let entry = CacheEntry {
            team_id,
            payload,
            cached_at: now_millis(),
        };
        self.lock_entries().insert(key, entry);
        self.schedule_persist();
    }

    /// Empty the table and delete the persisted blob.
    pub async fn clear(&self) {
        let _guard = self.inner.writer.lock().await;
        self.lock_entries().clear();
        if let Err(e) = self.inner.storage.remove_item(STORAGE_KEY).await {
            warn!(error = %e, "failed to remove persisted team cache");
        }
        info!("team cache cleared");
    }

    /// Write the current table out and wait for it. For shutdown, so
    /// scheduled writes are not lost with the process.
    pub async fn flush(&self) {
        self.persist().await;
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Detach a background write of the full table. Failures are logged
    /// inside the task and never reach the caller.
    fn schedule_persist(&self) {
        let cache = self.clone();
        tokio::spawn(async move {
            cache.persist().await;
        });
    }

    async fn persist(&self) {
        let _guard = self.inner.writer.lock().await;
        // Snapshot the live table under the write lock, so a task that was
        // scheduled early still writes the newest state.
        let snapshot = self.lock_entries().clone();
        let blob = match serde_json::to_string(&snapshot) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "failed to serialize team cache");
                return;
            }
        };
        if let Err(e) = self.inner.storage.set_item(STORAGE_KEY, blob).await {
            warn!(error = %e, "failed to persist team cache");
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn cache_key(number: &str, program: &str) -> String {
    format!("{program}:{number}")
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
