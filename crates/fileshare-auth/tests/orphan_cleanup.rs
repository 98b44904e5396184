//! Upload and overwrite failures must not leave unreferenced blobs behind

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use fileshare_auth::{
    AuthError, AuthResult, ContentUpdate, File, FileId, FileShare, FileShareService,
    InMemoryMetadataStore, MetadataStore, NewFile, NewShare, NewUser, ShareId, User, UserId,
};
use fileshare_storage::InMemoryBlobStore;

/// Delegates to an in-memory store, failing file writes while `broken` is set
#[derive(Default)]
struct FlakyMetadata {
    inner: InMemoryMetadataStore,
    broken: AtomicBool,
}

impl FlakyMetadata {
    fn break_writes(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> AuthResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(AuthError::StorageWrite("database is locked".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for FlakyMetadata {
    async fn insert_user(&self, user: NewUser) -> AuthResult<User> {
        self.inner.insert_user(user).await
    }

    async fn find_user(&self, id: UserId) -> AuthResult<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        self.inner.find_user_by_username(username).await
    }

    async fn list_users(&self) -> AuthResult<Vec<User>> {
        self.inner.list_users().await
    }

    async fn insert_file(&self, file: NewFile) -> AuthResult<File> {
        self.check()?;
        self.inner.insert_file(file).await
    }

    async fn find_file(&self, id: FileId) -> AuthResult<Option<File>> {
        self.inner.find_file(id).await
    }

    async fn files_owned_by(&self, owner: UserId) -> AuthResult<Vec<File>> {
        self.inner.files_owned_by(owner).await
    }

    async fn update_file_content(&self, id: FileId, update: ContentUpdate) -> AuthResult<File> {
        self.check()?;
        self.inner.update_file_content(id, update).await
    }

    async fn delete_file(&self, id: FileId) -> AuthResult<bool> {
        self.inner.delete_file(id).await
    }

    async fn insert_share(&self, share: NewShare) -> AuthResult<FileShare> {
        self.inner.insert_share(share).await
    }

    async fn find_share(&self, id: ShareId) -> AuthResult<Option<FileShare>> {
        self.inner.find_share(id).await
    }

    async fn find_share_for(
        &self,
        file: FileId,
        grantee: UserId,
    ) -> AuthResult<Option<FileShare>> {
        self.inner.find_share_for(file, grantee).await
    }

    async fn shares_for_file(&self, file: FileId) -> AuthResult<Vec<FileShare>> {
        self.inner.shares_for_file(file).await
    }

    async fn shares_for_grantee(&self, grantee: UserId) -> AuthResult<Vec<FileShare>> {
        self.inner.shares_for_grantee(grantee).await
    }

    async fn delete_share(&self, id: ShareId) -> AuthResult<bool> {
        self.inner.delete_share(id).await
    }

    async fn delete_shares_for_file(&self, file: FileId) -> AuthResult<usize> {
        self.inner.delete_shares_for_file(file).await
    }
}

#[tokio::test]
async fn test_failed_insert_deletes_blob() {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let metadata = Arc::new(FlakyMetadata::default());
    let service = FileShareService::new(blobs.clone(), metadata.clone());

    let alice = service
        .users()
        .register("alice", "alice@example.com", "")
        .await
        .unwrap();
    metadata.break_writes();

    let result = service
        .registry()
        .create(alice.id, "a.txt", b"orphan", "text/plain")
        .await;

    assert!(matches!(result, Err(AuthError::StorageWrite(_))));
    assert!(blobs.is_empty());
    assert!(service.registry().list_owned_by(alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_overwrite_keeps_old_content() {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let metadata = Arc::new(FlakyMetadata::default());
    let service = FileShareService::new(blobs.clone(), metadata.clone());

    let alice = service
        .users()
        .register("alice", "alice@example.com", "")
        .await
        .unwrap();
    let file = service
        .registry()
        .create(alice.id, "a.txt", b"original", "text/plain")
        .await
        .unwrap();
    metadata.break_writes();

    let result = service
        .registry()
        .overwrite(file.id, alice.id, b"replacement")
        .await;

    assert!(result.is_err());
    assert_eq!(blobs.len(), 1);
    assert_eq!(
        service.registry().read_content(file.id, alice.id).await.unwrap(),
        b"original"
    );
}
