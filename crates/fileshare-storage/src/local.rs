//! Local filesystem storage backend

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{StorageError, StorageResult};
use crate::traits::{BlobKey, BlobStore};

const BLOBS_DIR: &str = "blobs";
const STAGING_DIR: &str = "staging";

/// Local filesystem storage
///
/// Blobs are written to `{root}/staging/{key}` and renamed into
/// `{root}/blobs/{key}` once flushed, so readers never observe a
/// partially written blob.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create storage at the given root directory
    ///
    /// Creates the directory structure if it doesn't exist.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(BLOBS_DIR)).await?;
        fs::create_dir_all(root.join(STAGING_DIR)).await?;
        Ok(Self { root })
    }

    fn blob_path(&self, key: &BlobKey) -> PathBuf {
        self.root.join(BLOBS_DIR).join(key.as_str())
    }

    fn staging_path(&self, key: &BlobKey) -> PathBuf {
        self.root.join(STAGING_DIR).join(key.as_str())
    }

    async fn write_staged(&self, key: &BlobKey, data: &[u8]) -> StorageResult<()> {
        let staging = self.staging_path(key);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)
            .await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&staging, self.blob_path(key)).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, data: &[u8]) -> StorageResult<BlobKey> {
        let mut key = BlobKey::generate();
        while fs::try_exists(self.blob_path(&key)).await? {
            key = BlobKey::generate();
        }

        if let Err(e) = self.write_staged(&key, data).await {
            // Leave nothing half-written behind
            let _ = fs::remove_file(self.staging_path(&key)).await;
            return Err(e);
        }
        Ok(key)
    }

    async fn get(&self, key: &BlobKey) -> StorageResult<Vec<u8>> {
        match fs::read(self.blob_path(key)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &BlobKey) -> StorageResult<bool> {
        Ok(fs::try_exists(self.blob_path(key)).await?)
    }

    async fn delete(&self, key: &BlobKey) -> StorageResult<()> {
        match fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> StorageResult<Vec<BlobKey>> {
        let mut keys = Vec::new();

        let mut entries = fs::read_dir(self.root.join(BLOBS_DIR)).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(key) = BlobKey::parse(name) {
                    keys.push(key);
                }
            }
        }

        Ok(keys)
    }
}
