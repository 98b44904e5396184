//! Transfer representations handed to boundary layers
//!
//! Each view is built from its entity by an explicit `From` impl. Storage
//! keys and credential hashes have no field here, so they cannot leak.

use serde::Serialize;

use crate::model::{File, FileId, FileShare, Permission, ShareId, User, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileView {
    pub id: FileId,
    pub owner: UserId,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub digest: String,
    pub uploaded_at: u64,
}

impl From<&File> for FileView {
    fn from(file: &File) -> Self {
        Self {
            id: file.id,
            owner: file.owner,
            filename: file.original_filename.clone(),
            size: file.size,
            content_type: file.content_type.clone(),
            digest: file.digest.clone(),
            uploaded_at: file.uploaded_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileShareView {
    pub id: ShareId,
    pub file_id: FileId,
    pub grantee: UserId,
    pub permission: Permission,
    pub shared_at: u64,
}

impl From<&FileShare> for FileShareView {
    fn from(share: &FileShare) -> Self {
        Self {
            id: share.id,
            file_id: share.file_id,
            grantee: share.grantee,
            permission: share.permission,
            shared_at: share.shared_at,
        }
    }
}
