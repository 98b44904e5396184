//! File registry: upload, lookup, content access and deletion

use std::collections::BTreeMap;
use std::sync::Arc;

use fileshare_storage::{BlobKey, BlobStore};
use tracing::{debug, info, instrument, warn};

use crate::authorizer::AccessAuthorizer;
use crate::error::{AuthError, AuthResult};
use crate::ledger::ShareLedger;
use crate::locks::FileLocks;
use crate::metadata::MetadataStore;
use crate::model::{
    ContentUpdate, File, FileId, FileShare, NewFile, Permission, User, UserId, unix_now,
};

/// Base58 Blake3 digest recorded with every file
fn content_digest(data: &[u8]) -> String {
    bs58::encode(blake3::hash(data).as_bytes()).into_string()
}

/// Owns the lifecycle of [`File`] records and their blobs
///
/// Every content access goes through the [`AccessAuthorizer`] first.
/// Reads hold a per-file shared lock and deletes or overwrites an exclusive
/// one, so a read sees either the whole previous blob or `NotFound`.
pub struct FileRegistry {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    authorizer: AccessAuthorizer,
    locks: FileLocks,
    max_upload_bytes: Option<u64>,
}

impl FileRegistry {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        authorizer: AccessAuthorizer,
    ) -> Self {
        Self {
            blobs,
            metadata,
            authorizer,
            locks: FileLocks::default(),
            max_upload_bytes: None,
        }
    }

    /// Reject uploads and overwrites larger than `max` bytes
    pub fn with_upload_limit(mut self, max: u64) -> Self {
        self.max_upload_bytes = Some(max);
        self
    }

    pub fn authorizer(&self) -> &AccessAuthorizer {
        &self.authorizer
    }

    fn ledger(&self) -> &ShareLedger {
        self.authorizer.ledger()
    }

    fn check_size(&self, len: usize) -> AuthResult<()> {
        match self.max_upload_bytes {
            Some(max) if len as u64 > max => Err(AuthError::TooLarge {
                size: len as u64,
                max,
            }),
            _ => Ok(()),
        }
    }

    async fn require_file(&self, file_id: FileId) -> AuthResult<File> {
        self.metadata
            .find_file(file_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("File {file_id}")))
    }

    /// Delete a blob nobody references any more. Failure is logged only.
    async fn discard_blob(&self, key: &BlobKey) {
        if let Err(e) = self.blobs.delete(key).await {
            warn!(key = %key, error = %e, "failed to delete unreferenced blob");
        }
    }

    /// Store a new upload owned by `owner`
    ///
    /// The blob is written first. If the record cannot be created the blob
    /// is deleted again before the error is returned.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn create(
        &self,
        owner: UserId,
        original_filename: &str,
        content: &[u8],
        content_type: &str,
    ) -> AuthResult<File> {
        self.check_size(content.len())?;

        if self.metadata.find_user(owner).await?.is_none() {
            return Err(AuthError::NotFound(format!("User {owner}")));
        }

        let storage_key = self.blobs.put(content).await.map_err(AuthError::write)?;

        let record = NewFile {
            owner,
            storage_key: storage_key.clone(),
            original_filename: original_filename.to_string(),
            size: content.len() as u64,
            content_type: content_type.to_string(),
            digest: content_digest(content),
            uploaded_at: unix_now(),
        };

        match self.metadata.insert_file(record).await {
            Ok(file) => {
                info!(file = %file.id, %owner, "stored {}", file.original_filename);
                Ok(file)
            }
            Err(e) => {
                self.discard_blob(&storage_key).await;
                Err(e)
            }
        }
    }

    pub async fn get(&self, file_id: FileId) -> AuthResult<Option<File>> {
        self.metadata.find_file(file_id).await
    }

    /// Files owned by `user`, by ascending id
    pub async fn list_owned_by(&self, user: UserId) -> AuthResult<Vec<File>> {
        self.metadata.files_owned_by(user).await
    }

    /// Files shared with `user`, by ascending id
    ///
    /// Never includes files `user` owns, even if a share names them.
    pub async fn list_shared_with(&self, user: UserId) -> AuthResult<Vec<File>> {
        let mut files = BTreeMap::new();

        for share in self.ledger().list_for_user(user).await? {
            if files.contains_key(&share.file_id) {
                continue;
            }
            // A share whose file vanished mid-listing is skipped
            if let Some(file) = self.metadata.find_file(share.file_id).await? {
                if !AccessAuthorizer::owns(&file, user) {
                    files.insert(file.id, file);
                }
            }
        }

        Ok(files.into_values().collect())
    }

    /// Remove a file, its blob and all of its shares. Owner only.
    #[instrument(skip(self))]
    pub async fn delete(&self, file_id: FileId, acting: UserId) -> AuthResult<()> {
        let _guard = self.locks.write(file_id).await;

        let file = self.require_file(file_id).await?;
        if !self.authorizer.can_delete(&file, acting) {
            warn!(file = %file_id, %acting, "delete refused");
            return Err(AuthError::NotOwner(
                "You can only delete your own files".into(),
            ));
        }

        self.blobs
            .delete(&file.storage_key)
            .await
            .map_err(AuthError::write)?;
        self.ledger().purge_file(file_id).await?;
        self.metadata.delete_file(file_id).await?;

        info!(file = %file_id, "deleted {}", file.original_filename);
        Ok(())
    }

    /// Download content. Requires read access.
    #[instrument(skip(self))]
    pub async fn read_content(&self, file_id: FileId, acting: UserId) -> AuthResult<Vec<u8>> {
        let _guard = self.locks.read(file_id).await;

        let file = self.require_file(file_id).await?;
        if !self.authorizer.can_read(&file, acting).await? {
            warn!(file = %file_id, %acting, "read refused");
            return Err(AuthError::AccessDenied("Access denied".into()));
        }

        let data = self
            .blobs
            .get(&file.storage_key)
            .await
            .map_err(AuthError::read)?;

        if content_digest(&data) != file.digest {
            return Err(AuthError::StorageRead(format!(
                "Content of file {file_id} does not match its digest"
            )));
        }

        debug!(file = %file_id, size = data.len(), "read content");
        Ok(data)
    }

    /// Replace content. Requires write access.
    ///
    /// The old blob is deleted only after the record points at the new one.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn overwrite(
        &self,
        file_id: FileId,
        acting: UserId,
        content: &[u8],
    ) -> AuthResult<File> {
        self.check_size(content.len())?;
        let _guard = self.locks.write(file_id).await;

        let file = self.require_file(file_id).await?;
        if !self.authorizer.can_write(&file, acting).await? {
            warn!(file = %file_id, %acting, "overwrite refused");
            return Err(AuthError::AccessDenied("Write access required".into()));
        }

        let storage_key = self.blobs.put(content).await.map_err(AuthError::write)?;
        let update = ContentUpdate {
            storage_key: storage_key.clone(),
            size: content.len() as u64,
            digest: content_digest(content),
        };

        let updated = match self.metadata.update_file_content(file_id, update).await {
            Ok(updated) => updated,
            Err(e) => {
                self.discard_blob(&storage_key).await;
                return Err(e);
            }
        };
        self.discard_blob(&file.storage_key).await;

        info!(file = %file_id, %acting, "replaced content");
        Ok(updated)
    }

    /// Share a file on behalf of `acting`, who must own it
    pub async fn share(
        &self,
        file_id: FileId,
        acting: UserId,
        grantee: UserId,
        permission: Permission,
    ) -> AuthResult<FileShare> {
        let file = self.require_file(file_id).await?;
        if !self.authorizer.can_manage_shares(&file, acting) {
            warn!(file = %file_id, %acting, "share refused");
            return Err(AuthError::NotOwner(
                "Only file owner can share this file".into(),
            ));
        }

        self.ledger()
            .grant(file.id, file.owner, grantee, permission)
            .await
    }

    /// Shares on a file, visible to anyone who can read it
    pub async fn shares_for_file(
        &self,
        file_id: FileId,
        acting: UserId,
    ) -> AuthResult<Vec<FileShare>> {
        let file = self.require_file(file_id).await?;
        if !self.authorizer.can_read(&file, acting).await? {
            return Err(AuthError::AccessDenied("Access denied".into()));
        }

        self.ledger().list_for_file(file_id).await
    }

    /// Users holding a share on a file
    pub async fn users_with_access(&self, file_id: FileId, acting: UserId) -> AuthResult<Vec<User>> {
        let mut users = Vec::new();
        for share in self.shares_for_file(file_id, acting).await? {
            if let Some(user) = self.metadata.find_user(share.grantee).await? {
                users.push(user);
            }
        }
        Ok(users)
    }
}
