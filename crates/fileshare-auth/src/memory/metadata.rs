//! In-memory metadata store

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{AuthError, AuthResult};
use crate::metadata::MetadataStore;
use crate::model::{
    ContentUpdate, File, FileId, FileShare, NewFile, NewShare, NewUser, ShareId, User, UserId,
};

#[derive(Default)]
struct Tables {
    last_user_id: i64,
    last_file_id: i64,
    last_share_id: i64,
    users: BTreeMap<UserId, User>,
    files: BTreeMap<FileId, File>,
    shares: BTreeMap<ShareId, FileShare>,
    /// (file, grantee) -> share; the uniqueness constraint
    share_index: HashMap<(FileId, UserId), ShareId>,
}

impl Tables {
    fn remove_shares_for_file(&mut self, file: FileId) -> usize {
        let doomed: Vec<ShareId> = self
            .shares
            .values()
            .filter(|s| s.file_id == file)
            .map(|s| s.id)
            .collect();

        for id in &doomed {
            if let Some(share) = self.shares.remove(id) {
                self.share_index.remove(&(share.file_id, share.grantee));
            }
        }
        doomed.len()
    }
}

/// In-memory metadata store for testing
///
/// All tables sit behind one lock, so every operation is atomic with
/// respect to every other.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    tables: RwLock<Tables>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored file records
    pub fn file_count(&self) -> usize {
        self.read().files.len()
    }

    /// Number of active shares
    pub fn share_count(&self) -> usize {
        self.read().shares.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn insert_user(&self, user: NewUser) -> AuthResult<User> {
        let mut tables = self.write();

        for existing in tables.users.values() {
            if existing.username == user.username {
                return Err(AuthError::AlreadyExists(format!(
                    "Username '{}' is taken",
                    user.username
                )));
            }
            if existing.email == user.email {
                return Err(AuthError::AlreadyExists(format!(
                    "Email '{}' is already registered",
                    user.email
                )));
            }
        }

        tables.last_user_id += 1;
        let stored = User {
            id: UserId::new(tables.last_user_id),
            username: user.username,
            email: user.email,
            credential_hash: user.credential_hash,
            created_at: user.created_at,
        };
        tables.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_user(&self, id: UserId) -> AuthResult<Option<User>> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        Ok(self
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> AuthResult<Vec<User>> {
        Ok(self.read().users.values().cloned().collect())
    }

    async fn insert_file(&self, file: NewFile) -> AuthResult<File> {
        let mut tables = self.write();

        if !tables.users.contains_key(&file.owner) {
            return Err(AuthError::NotFound(format!("User {}", file.owner)));
        }

        tables.last_file_id += 1;
        let stored = File {
            id: FileId::new(tables.last_file_id),
            owner: file.owner,
            storage_key: file.storage_key,
            original_filename: file.original_filename,
            size: file.size,
            content_type: file.content_type,
            digest: file.digest,
            uploaded_at: file.uploaded_at,
        };
        tables.files.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_file(&self, id: FileId) -> AuthResult<Option<File>> {
        Ok(self.read().files.get(&id).cloned())
    }

    async fn files_owned_by(&self, owner: UserId) -> AuthResult<Vec<File>> {
        Ok(self
            .read()
            .files
            .values()
            .filter(|f| f.owner == owner)
            .cloned()
            .collect())
    }

    async fn update_file_content(&self, id: FileId, update: ContentUpdate) -> AuthResult<File> {
        let mut tables = self.write();

        let file = tables
            .files
            .get_mut(&id)
            .ok_or_else(|| AuthError::NotFound(format!("File {id}")))?;
        file.storage_key = update.storage_key;
        file.size = update.size;
        file.digest = update.digest;
        Ok(file.clone())
    }

    async fn delete_file(&self, id: FileId) -> AuthResult<bool> {
        let mut tables = self.write();

        tables.remove_shares_for_file(id);
        Ok(tables.files.remove(&id).is_some())
    }

    async fn insert_share(&self, share: NewShare) -> AuthResult<FileShare> {
        let mut tables = self.write();

        if !tables.files.contains_key(&share.file_id) {
            return Err(AuthError::NotFound(format!("File {}", share.file_id)));
        }
        if !tables.users.contains_key(&share.grantee) {
            return Err(AuthError::NotFound(format!("User {}", share.grantee)));
        }

        let pair = (share.file_id, share.grantee);
        if tables.share_index.contains_key(&pair) {
            return Err(AuthError::InvalidGrant(
                "File already shared with this user".into(),
            ));
        }

        tables.last_share_id += 1;
        let stored = FileShare {
            id: ShareId::new(tables.last_share_id),
            file_id: share.file_id,
            grantee: share.grantee,
            permission: share.permission,
            shared_at: share.shared_at,
        };
        tables.share_index.insert(pair, stored.id);
        tables.shares.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_share(&self, id: ShareId) -> AuthResult<Option<FileShare>> {
        Ok(self.read().shares.get(&id).cloned())
    }

    async fn find_share_for(
        &self,
        file: FileId,
        grantee: UserId,
    ) -> AuthResult<Option<FileShare>> {
        let tables = self.read();
        Ok(tables
            .share_index
            .get(&(file, grantee))
            .and_then(|id| tables.shares.get(id))
            .cloned())
    }

    async fn shares_for_file(&self, file: FileId) -> AuthResult<Vec<FileShare>> {
        Ok(self
            .read()
            .shares
            .values()
            .filter(|s| s.file_id == file)
            .cloned()
            .collect())
    }

    async fn shares_for_grantee(&self, grantee: UserId) -> AuthResult<Vec<FileShare>> {
        Ok(self
            .read()
            .shares
            .values()
            .filter(|s| s.grantee == grantee)
            .cloned()
            .collect())
    }

    async fn delete_share(&self, id: ShareId) -> AuthResult<bool> {
        let mut tables = self.write();

        match tables.shares.remove(&id) {
            Some(share) => {
                tables.share_index.remove(&(share.file_id, share.grantee));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_shares_for_file(&self, file: FileId) -> AuthResult<usize> {
        Ok(self.write().remove_shares_for_file(file))
    }
}

#[cfg(test)]
mod tests {
    use fileshare_storage::BlobKey;

    use super::*;
    use crate::model::Permission;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.into(),
            email: format!("{name}@example.com"),
            credential_hash: "hash".into(),
            created_at: 0,
        }
    }

    fn new_file(owner: UserId) -> NewFile {
        NewFile {
            owner,
            storage_key: BlobKey::generate(),
            original_filename: "test.txt".into(),
            size: 4,
            content_type: "text/plain".into(),
            digest: "d".into(),
            uploaded_at: 0,
        }
    }

    fn new_share(file_id: FileId, grantee: UserId) -> NewShare {
        NewShare {
            file_id,
            grantee,
            permission: Permission::Read,
            shared_at: 0,
        }
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = InMemoryMetadataStore::new();
        store.insert_user(new_user("alice")).await.unwrap();

        let dup_name = store.insert_user(new_user("alice")).await;
        assert!(matches!(dup_name, Err(AuthError::AlreadyExists(_))));

        let mut dup_email = new_user("alicia");
        dup_email.email = "alice@example.com".into();
        let result = store.insert_user(dup_email).await;
        assert!(matches!(result, Err(AuthError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_ids_not_reused() {
        let store = InMemoryMetadataStore::new();
        let owner = store.insert_user(new_user("alice")).await.unwrap();

        let first = store.insert_file(new_file(owner.id)).await.unwrap();
        store.delete_file(first.id).await.unwrap();
        let second = store.insert_file(new_file(owner.id)).await.unwrap();

        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_file_requires_owner() {
        let store = InMemoryMetadataStore::new();
        let result = store.insert_file(new_file(UserId::new(42))).await;
        assert!(matches!(result, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_share_pair_unique() {
        let store = InMemoryMetadataStore::new();
        let owner = store.insert_user(new_user("alice")).await.unwrap();
        let bob = store.insert_user(new_user("bob")).await.unwrap();
        let file = store.insert_file(new_file(owner.id)).await.unwrap();

        store.insert_share(new_share(file.id, bob.id)).await.unwrap();
        let result = store.insert_share(new_share(file.id, bob.id)).await;

        assert!(matches!(result, Err(AuthError::InvalidGrant(_))));
        assert_eq!(store.share_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_file_cascades() {
        let store = InMemoryMetadataStore::new();
        let owner = store.insert_user(new_user("alice")).await.unwrap();
        let bob = store.insert_user(new_user("bob")).await.unwrap();
        let carol = store.insert_user(new_user("carol")).await.unwrap();
        let file = store.insert_file(new_file(owner.id)).await.unwrap();
        let other = store.insert_file(new_file(owner.id)).await.unwrap();

        store.insert_share(new_share(file.id, bob.id)).await.unwrap();
        store.insert_share(new_share(file.id, carol.id)).await.unwrap();
        store.insert_share(new_share(other.id, bob.id)).await.unwrap();

        assert!(store.delete_file(file.id).await.unwrap());
        assert!(!store.delete_file(file.id).await.unwrap());

        assert!(store.shares_for_file(file.id).await.unwrap().is_empty());
        assert!(store.find_share_for(file.id, bob.id).await.unwrap().is_none());
        assert_eq!(store.shares_for_grantee(bob.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_share_clears_index() {
        let store = InMemoryMetadataStore::new();
        let owner = store.insert_user(new_user("alice")).await.unwrap();
        let bob = store.insert_user(new_user("bob")).await.unwrap();
        let file = store.insert_file(new_file(owner.id)).await.unwrap();

        let share = store.insert_share(new_share(file.id, bob.id)).await.unwrap();
        assert!(store.delete_share(share.id).await.unwrap());
        assert!(!store.delete_share(share.id).await.unwrap());

        // Pair is free again
        store.insert_share(new_share(file.id, bob.id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_files_owned_by_ascending() {
        let store = InMemoryMetadataStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let bob = store.insert_user(new_user("bob")).await.unwrap();

        let a1 = store.insert_file(new_file(alice.id)).await.unwrap();
        store.insert_file(new_file(bob.id)).await.unwrap();
        let a2 = store.insert_file(new_file(alice.id)).await.unwrap();

        let owned: Vec<FileId> = store
            .files_owned_by(alice.id)
            .await
            .unwrap()
            .iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(owned, vec![a1.id, a2.id]);
    }
}
