//! Blob store contract for audio payloads.
//!
//! The playback engine only reads payloads (from its loader thread); the host writes them when
//! clips are saved and deletes them when clips go away.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::clip::BlobKey;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob store i/o error: {0}")]
    Io(#[from] io::Error),

    /// The key cannot be mapped onto the backing storage.
    #[error("invalid blob key: {0:?}")]
    InvalidKey(String),

    #[error("blob store lock poisoned")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

/// Persists raw audio payloads by opaque key.
pub trait BlobStore: Send + Sync {
    fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<(), StoreError>;

    /// Returns `Ok(None)` for keys that were never stored (or were deleted).
    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, StoreError>;

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &BlobKey) -> Result<(), StoreError>;
}

/// Deletes `key`, logging instead of failing. Payload cleanup never blocks removing a clip.
pub fn delete_best_effort(store: &dyn BlobStore, key: &BlobKey) {
    if let Err(err) = store.delete(key) {
        log::warn!("failed to delete blob {key}: {err}");
    }
}

/// In-memory store, mainly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<BlobKey, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs.lock()?.insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.lock()?.get(key).cloned())
    }

    fn delete(&self, key: &BlobKey) -> Result<(), StoreError> {
        self.blobs.lock()?.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        log::debug!("blob store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &BlobKey) -> Result<PathBuf, StoreError> {
        let raw = key.as_str();
        let valid = !raw.is_empty()
            && !raw.starts_with('.')
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if !valid {
            return Err(StoreError::InvalidKey(raw.to_string()));
        }
        Ok(self.root.join(raw))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        // Keys never start with '.', so the temp name cannot shadow another blob.
        let tmp = self.root.join(format!(".{key}.partial"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn delete(&self, key: &BlobKey) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
