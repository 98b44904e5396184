//! Storage trait definitions

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Length of a key in its textual form (simple-format UUID)
const KEY_LEN: usize = 32;

/// Opaque name of a stored blob
///
/// Always 32 lowercase hex characters, so it is safe to use as a file name
/// on any backend.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey(String);

impl BlobKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Validate and wrap a key read back from a metadata record
    pub fn parse(s: &str) -> StorageResult<Self> {
        let valid = s.len() == KEY_LEN
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(StorageError::InvalidKey(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobKey({})", &self.0[..8])
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlobKey {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for BlobKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Byte storage addressed by store-generated keys
///
/// Implementations must make a blob visible to `get` only once it has been
/// written completely.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a freshly generated key and return the key
    async fn put(&self, data: &[u8]) -> StorageResult<BlobKey>;

    /// Retrieve a blob
    ///
    /// Returns `StorageError::NotFound` if the key doesn't exist.
    async fn get(&self, key: &BlobKey) -> StorageResult<Vec<u8>>;

    /// Check if a blob exists
    async fn exists(&self, key: &BlobKey) -> StorageResult<bool>;

    /// Delete a blob
    ///
    /// Returns `Ok(())` even if the blob didn't exist (idempotent).
    async fn delete(&self, key: &BlobKey) -> StorageResult<()>;

    /// List all blob keys (primarily for testing/debugging)
    async fn list(&self) -> StorageResult<Vec<BlobKey>>;
}
