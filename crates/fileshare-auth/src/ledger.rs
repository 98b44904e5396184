//! Share ledger: grants and revocations

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::authorizer::AccessAuthorizer;
use crate::error::{AuthError, AuthResult};
use crate::metadata::MetadataStore;
use crate::model::{FileId, FileShare, NewShare, Permission, ShareId, UserId, unix_now};

/// Owns the lifecycle of [`FileShare`] records
///
/// `grant` trusts its caller to pass the file's real owner; ownership is
/// verified by the registry before it gets here.
#[derive(Clone)]
pub struct ShareLedger {
    metadata: Arc<dyn MetadataStore>,
}

impl ShareLedger {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Record a new share from `owner` to `grantee`
    ///
    /// Fails with `InvalidGrant` on a self-share or when the pair is already
    /// shared. Changing a permission means revoking and granting again.
    #[instrument(skip(self))]
    pub async fn grant(
        &self,
        file_id: FileId,
        owner: UserId,
        grantee: UserId,
        permission: Permission,
    ) -> AuthResult<FileShare> {
        if grantee == owner {
            return Err(AuthError::InvalidGrant(
                "Cannot share file with owner".into(),
            ));
        }

        let file = self
            .metadata
            .find_file(file_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("File {file_id}")))?;
        if file.owner == grantee {
            return Err(AuthError::InvalidGrant(
                "Cannot share file with owner".into(),
            ));
        }

        if self.metadata.find_user(grantee).await?.is_none() {
            return Err(AuthError::NotFound(format!("User {grantee}")));
        }

        if self.exists(file_id, grantee).await? {
            return Err(AuthError::InvalidGrant(
                "File already shared with this user".into(),
            ));
        }

        // The store's own uniqueness check settles racing grants
        let share = self
            .metadata
            .insert_share(NewShare {
                file_id,
                grantee,
                permission,
                shared_at: unix_now(),
            })
            .await?;

        info!(share = %share.id, "granted {permission} on file {file_id} to user {grantee}");
        Ok(share)
    }

    /// Delete a share. Only the owner of the shared file may do this.
    #[instrument(skip(self))]
    pub async fn revoke(&self, share_id: ShareId, acting: UserId) -> AuthResult<()> {
        let share = self
            .get(share_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("Share {share_id}")))?;

        let file = self
            .metadata
            .find_file(share.file_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("Share {share_id}")))?;

        if !AccessAuthorizer::owns(&file, acting) {
            return Err(AuthError::NotOwner(
                "Only file owner can revoke shares".into(),
            ));
        }

        if !self.metadata.delete_share(share_id).await? {
            // Revoked concurrently by another request
            return Err(AuthError::NotFound(format!("Share {share_id}")));
        }

        info!(file = %file.id, grantee = %share.grantee, "revoked share {share_id}");
        Ok(())
    }

    pub async fn get(&self, share_id: ShareId) -> AuthResult<Option<FileShare>> {
        self.metadata.find_share(share_id).await
    }

    /// The active share for a (file, user) pair
    pub async fn find(&self, file_id: FileId, user: UserId) -> AuthResult<Option<FileShare>> {
        self.metadata.find_share_for(file_id, user).await
    }

    pub async fn exists(&self, file_id: FileId, user: UserId) -> AuthResult<bool> {
        Ok(self.find(file_id, user).await?.is_some())
    }

    pub async fn list_for_file(&self, file_id: FileId) -> AuthResult<Vec<FileShare>> {
        self.metadata.shares_for_file(file_id).await
    }

    pub async fn list_for_user(&self, user: UserId) -> AuthResult<Vec<FileShare>> {
        self.metadata.shares_for_grantee(user).await
    }

    /// Cascade step of file deletion
    pub(crate) async fn purge_file(&self, file_id: FileId) -> AuthResult<usize> {
        let removed = self.metadata.delete_shares_for_file(file_id).await?;
        debug!(file = %file_id, removed, "purged shares");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use fileshare_storage::BlobKey;

    use super::*;
    use crate::memory::InMemoryMetadataStore;
    use crate::model::{File, NewFile, NewUser};

    async fn setup() -> (ShareLedger, File, UserId, UserId, UserId) {
        let store = Arc::new(InMemoryMetadataStore::new());
        let mut ids = Vec::new();
        for name in ["owner", "bob", "carol"] {
            let user = store
                .insert_user(NewUser {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    credential_hash: String::new(),
                    created_at: 0,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let file = store
            .insert_file(NewFile {
                owner: ids[0],
                storage_key: BlobKey::generate(),
                original_filename: "test.txt".into(),
                size: 1024,
                content_type: "text/plain".into(),
                digest: String::new(),
                uploaded_at: 0,
            })
            .await
            .unwrap();

        (ShareLedger::new(store), file, ids[0], ids[1], ids[2])
    }

    #[tokio::test]
    async fn test_grant_and_exists() {
        let (ledger, file, owner, bob, carol) = setup().await;

        let share = ledger
            .grant(file.id, owner, bob, Permission::Read)
            .await
            .unwrap();

        assert_eq!(share.permission, Permission::Read);
        assert_eq!(share.grantee, bob);
        assert!(ledger.exists(file.id, bob).await.unwrap());
        assert!(!ledger.exists(file.id, carol).await.unwrap());
    }

    #[tokio::test]
    async fn test_self_share_rejected() {
        let (ledger, file, owner, _, _) = setup().await;

        let result = ledger.grant(file.id, owner, owner, Permission::Read).await;
        assert!(matches!(result, Err(AuthError::InvalidGrant(_))));
        assert!(ledger.list_for_file(file.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grant_to_real_owner_rejected() {
        let (ledger, file, owner, bob, _) = setup().await;

        // Caller passed the wrong owner; the grantee is the actual owner
        let result = ledger.grant(file.id, bob, owner, Permission::Read).await;
        assert!(matches!(result, Err(AuthError::InvalidGrant(_))));
    }

    #[tokio::test]
    async fn test_duplicate_grant_rejected() {
        let (ledger, file, owner, bob, _) = setup().await;

        ledger
            .grant(file.id, owner, bob, Permission::Read)
            .await
            .unwrap();
        let result = ledger.grant(file.id, owner, bob, Permission::Write).await;
        assert!(matches!(result, Err(AuthError::InvalidGrant(_))));

        let shares = ledger.list_for_file(file.id).await.unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].permission, Permission::Read);
    }

    #[tokio::test]
    async fn test_grant_unknown_file_or_user() {
        let (ledger, file, owner, _, _) = setup().await;

        let missing_file = ledger
            .grant(FileId::new(999), owner, UserId::new(2), Permission::Read)
            .await;
        assert!(matches!(missing_file, Err(AuthError::NotFound(_))));

        let missing_user = ledger
            .grant(file.id, owner, UserId::new(999), Permission::Read)
            .await;
        assert!(matches!(missing_user, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_revoke_by_owner() {
        let (ledger, file, owner, bob, _) = setup().await;

        let share = ledger
            .grant(file.id, owner, bob, Permission::Read)
            .await
            .unwrap();
        ledger.revoke(share.id, owner).await.unwrap();

        assert!(!ledger.exists(file.id, bob).await.unwrap());
        assert!(ledger.get(share.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_by_non_owner_keeps_share() {
        let (ledger, file, owner, bob, carol) = setup().await;

        let share = ledger
            .grant(file.id, owner, bob, Permission::Write)
            .await
            .unwrap();

        // Neither a stranger nor the grantee may revoke
        for actor in [carol, bob] {
            let result = ledger.revoke(share.id, actor).await;
            assert!(matches!(result, Err(AuthError::NotOwner(_))));
        }
        assert!(ledger.exists(file.id, bob).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_missing_share() {
        let (ledger, _, owner, _, _) = setup().await;

        let result = ledger.revoke(ShareId::new(404), owner).await;
        assert!(matches!(result, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let (ledger, file, owner, bob, carol) = setup().await;

        ledger
            .grant(file.id, owner, bob, Permission::Read)
            .await
            .unwrap();
        ledger
            .grant(file.id, owner, carol, Permission::Write)
            .await
            .unwrap();

        let bobs = ledger.list_for_user(bob).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].file_id, file.id);
        assert_eq!(ledger.list_for_file(file.id).await.unwrap().len(), 2);
    }
}
