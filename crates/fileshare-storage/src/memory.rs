//! In-memory storage backend (for testing)

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::traits::{BlobKey, BlobStore};

/// In-memory storage for unit tests
///
/// Thread-safe via `RwLock`. Not persistent; data is lost on drop.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobKey, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes stored
    pub fn total_size(&self) -> usize {
        self.read().values().map(|v| v.len()).sum()
    }

    /// Clear all stored blobs
    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<BlobKey, Vec<u8>>> {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<BlobKey, Vec<u8>>> {
        self.blobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, data: &[u8]) -> StorageResult<BlobKey> {
        let mut blobs = self.write();
        let mut key = BlobKey::generate();
        while blobs.contains_key(&key) {
            key = BlobKey::generate();
        }
        blobs.insert(key.clone(), data.to_vec());
        Ok(key)
    }

    async fn get(&self, key: &BlobKey) -> StorageResult<Vec<u8>> {
        self.read()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &BlobKey) -> StorageResult<bool> {
        Ok(self.read().contains_key(key))
    }

    async fn delete(&self, key: &BlobKey) -> StorageResult<()> {
        self.write().remove(key);
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<BlobKey>> {
        Ok(self.read().keys().cloned().collect())
    }
}
