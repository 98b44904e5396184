//! Persisted entities: users, files and shares

use std::fmt;
use std::str::FromStr;

use fileshare_storage::BlobKey;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

entity_id!(
    /// Store-assigned user id, never reassigned
    UserId
);
entity_id!(
    /// Store-assigned file id
    FileId
);
entity_id!(
    /// Store-assigned share id
    ShareId
);

/// Current Unix time in seconds
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A registered user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Opaque to this crate; produced and checked by the credential layer
    pub credential_hash: String,
    pub created_at: u64,
}

/// Fields for a user that has not been stored yet
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub credential_hash: String,
    pub created_at: u64,
}

/// One uploaded object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct File {
    pub id: FileId,
    /// Set once at upload; ownership is never transferred
    pub owner: UserId,
    /// Blob store key. Never shown to anyone but the core.
    pub storage_key: BlobKey,
    /// User supplied, display only
    pub original_filename: String,
    pub size: u64,
    pub content_type: String,
    /// Base58 Blake3 digest of the content
    pub digest: String,
    pub uploaded_at: u64,
}

/// Fields for a file record that has not been stored yet
#[derive(Clone, Debug)]
pub struct NewFile {
    pub owner: UserId,
    pub storage_key: BlobKey,
    pub original_filename: String,
    pub size: u64,
    pub content_type: String,
    pub digest: String,
    pub uploaded_at: u64,
}

/// Replacement content for an existing file record
#[derive(Clone, Debug)]
pub struct ContentUpdate {
    pub storage_key: BlobKey,
    pub size: u64,
    pub digest: String,
}

/// Access level carried by a share
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    /// Read file content
    Read,
    /// Read and replace file content. Does not include sharing.
    Write,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "READ",
            Permission::Write => "WRITE",
        }
    }

    /// WRITE implies READ
    pub fn allows_read(&self) -> bool {
        matches!(self, Permission::Read | Permission::Write)
    }

    pub fn allows_write(&self) -> bool {
        matches!(self, Permission::Write)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "READ" => Ok(Permission::Read),
            "WRITE" => Ok(Permission::Write),
            _ => Err(AuthError::InvalidGrant(format!(
                "Unrecognized permission '{s}'"
            ))),
        }
    }
}

/// A grant of access from a file's owner to another user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileShare {
    pub id: ShareId,
    pub file_id: FileId,
    pub grantee: UserId,
    pub permission: Permission,
    pub shared_at: u64,
}

/// Fields for a share that has not been stored yet
#[derive(Clone, Debug)]
pub struct NewShare {
    pub file_id: FileId,
    pub grantee: UserId,
    pub permission: Permission,
    pub shared_at: u64,
}
