//! Metadata store: persisted user, file and share records

use async_trait::async_trait;

use crate::error::AuthResult;
use crate::model::{
    ContentUpdate, File, FileId, FileShare, NewFile, NewShare, NewUser, ShareId, User, UserId,
};

/// Entity storage behind the registry, ledger and user directory
///
/// Absent records are `Ok(None)`, never an error. Implementations must
/// enforce uniqueness themselves (not check-then-insert in the caller):
///
/// - `insert_user` fails with `AlreadyExists` on a taken username or email
/// - `insert_share` fails with `InvalidGrant` when a share for the same
///   (file, grantee) pair exists, and with `NotFound` when either side is gone
/// - `delete_file` removes the file's shares in the same step
///
/// Each call must observe the effects of every call that completed before it.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Store a new user and assign its id
    async fn insert_user(&self, user: NewUser) -> AuthResult<User>;

    async fn find_user(&self, id: UserId) -> AuthResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// All users by ascending id
    async fn list_users(&self) -> AuthResult<Vec<User>>;

    /// Store a new file record and assign its id
    ///
    /// Fails with `NotFound` if the owner does not exist.
    async fn insert_file(&self, file: NewFile) -> AuthResult<File>;

    async fn find_file(&self, id: FileId) -> AuthResult<Option<File>>;

    /// Files owned by a user, by ascending id
    async fn files_owned_by(&self, owner: UserId) -> AuthResult<Vec<File>>;

    /// Point a file record at new content
    ///
    /// Fails with `NotFound` if the file does not exist.
    async fn update_file_content(&self, id: FileId, update: ContentUpdate) -> AuthResult<File>;

    /// Remove a file record and every share on it
    ///
    /// Returns `false` if the record did not exist.
    async fn delete_file(&self, id: FileId) -> AuthResult<bool>;

    /// Store a new share and assign its id
    async fn insert_share(&self, share: NewShare) -> AuthResult<FileShare>;

    async fn find_share(&self, id: ShareId) -> AuthResult<Option<FileShare>>;

    /// The share for a (file, grantee) pair, if any
    async fn find_share_for(&self, file: FileId, grantee: UserId)
    -> AuthResult<Option<FileShare>>;

    /// Shares on a file, by ascending id
    async fn shares_for_file(&self, file: FileId) -> AuthResult<Vec<FileShare>>;

    /// Shares naming a user as grantee, by ascending id
    async fn shares_for_grantee(&self, grantee: UserId) -> AuthResult<Vec<FileShare>>;

    /// Returns `false` if the share did not exist
    async fn delete_share(&self, id: ShareId) -> AuthResult<bool>;

    /// Remove every share on a file, returning how many were removed
    async fn delete_shares_for_file(&self, file: FileId) -> AuthResult<usize>;
}
