//! Integration tests for LocalBlobStore

use fileshare_storage::{BlobKey, BlobStore, LocalBlobStore, StorageError};
use tempfile::TempDir;

#[tokio::test]
async fn test_local_roundtrip() {
    let temp = TempDir::new().unwrap();
    let storage = LocalBlobStore::new(temp.path()).await.unwrap();

    let data = b"Local file storage test";
    let key = storage.put(data).await.unwrap();

    let retrieved = storage.get(&key).await.unwrap();
    assert_eq!(retrieved, data);
}

#[tokio::test]
async fn test_local_persistence() {
    let temp = TempDir::new().unwrap();

    let data = b"Persistent data";

    // Write with one instance
    let key = {
        let storage = LocalBlobStore::new(temp.path()).await.unwrap();
        storage.put(data).await.unwrap()
    };

    // Read with new instance
    {
        let storage = LocalBlobStore::new(temp.path()).await.unwrap();
        let retrieved = storage.get(&key).await.unwrap();
        assert_eq!(retrieved, data);
    }
}

#[tokio::test]
async fn test_local_list_ignores_staging() {
    let temp = TempDir::new().unwrap();
    let storage = LocalBlobStore::new(temp.path()).await.unwrap();

    for blob in [b"a", b"b", b"c"] {
        storage.put(blob).await.unwrap();
    }
    std::fs::write(temp.path().join("blobs").join("not-a-key"), b"x").unwrap();

    let listed = storage.list().await.unwrap();
    assert_eq!(listed.len(), 3);

    let staged = std::fs::read_dir(temp.path().join("staging")).unwrap().count();
    assert_eq!(staged, 0);
}

#[tokio::test]
async fn test_local_not_found() {
    let temp = TempDir::new().unwrap();
    let storage = LocalBlobStore::new(temp.path()).await.unwrap();

    let result = storage.get(&BlobKey::generate()).await;
    assert!(matches!(result, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn test_local_delete_idempotent() {
    let temp = TempDir::new().unwrap();
    let storage = LocalBlobStore::new(temp.path()).await.unwrap();

    let key = storage.put(b"gone soon").await.unwrap();
    storage.delete(&key).await.unwrap();
    storage.delete(&key).await.unwrap();

    assert!(!storage.exists(&key).await.unwrap());
}
