//! Persistence hook for the credential blob.
//!
//! Warden doesn't own a database. The host already has a save system
//! (world save data, a plugin data folder, a KV service) and the
//! credential map is stored there as ONE named blob. [`BlobStore`] is the
//! seam: two async methods, read a blob by name and overwrite it.
//!
//! Two implementations ship with the crate:
//! - [`MemoryBlobStore`]: for tests and throwaway servers
//! - [`FileBlobStore`]: one file per blob in a data directory

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::StoreError;

/// Reads and overwrites named blobs in the host's persistent store.
///
/// `Send + Sync + 'static` because the store lives inside the shared
/// gatekeeper state for the whole server lifetime and is used from
/// whichever runtime worker handles a command.
pub trait BlobStore: Send + Sync + 'static {
    /// Returns the blob's bytes, or `Ok(None)` if it was never written.
    fn get(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Replaces the blob's bytes in full.
    fn put(
        &self,
        name: &str,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryBlobStore
// ---------------------------------------------------------------------------

/// A [`BlobStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous peek, handy in tests.
    pub fn snapshot(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs.lock().get(name).cloned()
    }
}

impl BlobStore for MemoryBlobStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.lock().get(name).cloned())
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.blobs.lock().insert(name.to_string(), data);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileBlobStore
// ---------------------------------------------------------------------------

/// A [`BlobStore`] that keeps each blob in `<dir>/<name>.blob`.
///
/// Writes go to a temporary sibling first and are renamed into place, so
/// a crash mid-write leaves the previous blob intact rather than a
/// truncated one.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            && !name.starts_with('.');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid blob name {name:?}")));
        }
        Ok(self.dir.join(format!("{name}.blob")))
    }
}

impl BlobStore for FileBlobStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        let tmp = path.with_extension("blob.tmp");
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "blob written");
        Ok(())
    }
}
