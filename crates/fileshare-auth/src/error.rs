//! Auth service error types

use std::fmt::Display;

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not the owner: {0}")]
    NotOwner(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Upload too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    #[error("Storage read failed: {0}")]
    StorageRead(String),
}

/// Copyable tag for an [`AuthError`], for mapping onto transport status codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    NotOwner,
    AccessDenied,
    InvalidGrant,
    AlreadyExists,
    TooLarge,
    StorageWrite,
    StorageRead,
}

impl ErrorKind {
    /// Authorization failures: never retried, never downgraded
    pub fn is_authorization(&self) -> bool {
        matches!(self, ErrorKind::NotOwner | ErrorKind::AccessDenied)
    }

    /// Collaborator failures the boundary may choose to retry
    pub fn is_storage(&self) -> bool {
        matches!(self, ErrorKind::StorageWrite | ErrorKind::StorageRead)
    }
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::NotOwner(_) => ErrorKind::NotOwner,
            AuthError::AccessDenied(_) => ErrorKind::AccessDenied,
            AuthError::InvalidGrant(_) => ErrorKind::InvalidGrant,
            AuthError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            AuthError::TooLarge { .. } => ErrorKind::TooLarge,
            AuthError::StorageWrite(_) => ErrorKind::StorageWrite,
            AuthError::StorageRead(_) => ErrorKind::StorageRead,
        }
    }

    pub(crate) fn read(e: impl Display) -> Self {
        AuthError::StorageRead(e.to_string())
    }

    pub(crate) fn write(e: impl Display) -> Self {
        AuthError::StorageWrite(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_grouping() {
        assert!(AuthError::NotOwner("x".into()).kind().is_authorization());
        assert!(AuthError::AccessDenied("x".into()).kind().is_authorization());
        assert!(!AuthError::NotFound("x".into()).kind().is_authorization());
        assert!(AuthError::StorageWrite("x".into()).kind().is_storage());
        assert_eq!(
            AuthError::TooLarge { size: 2, max: 1 }.kind(),
            ErrorKind::TooLarge
        );
    }
}
