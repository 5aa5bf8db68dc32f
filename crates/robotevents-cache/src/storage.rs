//! Key-value storage behind the team cache
//!
//! The cache persists its whole table as one serialized blob under a fixed
//! key, so the storage surface is three operations on string values. The
//! file backend writes atomically (temp file + rename) so a crash mid-write
//! never leaves a torn blob; the memory backend exists for tests and
//! embedders that want no persistence.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use tracing::debug;

use crate::error::{Error, Result};

/// Boxed future used by [`Storage`] methods for dyn-compatibility
/// (`Arc<dyn Storage>`).
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Minimal key-value persistence surface.
pub trait Storage: Send + Sync {
    /// Read the value under `key`; `None` when the key was never written
    /// or has been removed.
    fn get_item<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set_item<'a>(&'a self, key: &'a str, value: String) -> StorageFuture<'a, ()>;

    /// Delete the value under `key`. Removing an absent key is not an
    /// error.
    fn remove_item<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()>;
}

/// File-backed storage: each key becomes `<root>/<key>.json`.
///
/// Keys are expected to be bare file stems chosen by this crate, not
/// arbitrary user input.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get_item<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        Box::pin(async move {
            match tokio::fs::read_to_string(self.item_path(key)).await {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(Error::Io(format!("reading {key}: {e}"))),
            }
        })
    }

    fn set_item<'a>(&'a self, key: &'a str, value: String) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.root)
                .await
                .map_err(|e| Error::Io(format!("creating storage dir: {e}")))?;
            write_atomic(&self.root, &self.item_path(key), key, value.as_bytes()).await
        })
    }

    fn remove_item<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            match tokio::fs::remove_file(self.item_path(key)).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Io(format!("removing {key}: {e}"))),
            }
        })
    }
}

/// Write a storage item atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target, so a crash mid-write cannot corrupt the blob. Permissions
/// are 0600 since resolved payloads may embed account-specific data.
async fn write_atomic(dir: &Path, path: &Path, key: &str, data: &[u8]) -> Result<()> {
    let tmp_path = dir.join(format!(".{key}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|e| Error::Io(format!("writing temp file for {key}: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting permissions for {key}: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp file for {key}: {e}")))?;

    debug!(path = %path.display(), "persisted storage item");
    Ok(())
}

/// In-memory storage for tests and cache-only embedders.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        Box::pin(async move {
            let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
            Ok(items.get(key).cloned())
        })
    }

    fn set_item<'a>(&'a self, key: &'a str, value: String) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
            items.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn remove_item<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
            items.remove(key);
            Ok(())
        })
    }
}
