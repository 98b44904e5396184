//! Access decisions: who may do what to a file

use tracing::debug;

use crate::error::AuthResult;
use crate::ledger::ShareLedger;
use crate::model::{File, UserId};

/// Operations an acting user can request on a file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    /// Download content, list the file's shares
    Read,
    /// Replace content
    Write,
    /// Grant and revoke shares
    ManageShares,
    /// Remove the file
    Delete,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::ManageShares => "manage-shares",
            Access::Delete => "delete",
        }
    }
}

/// The single place ownership and grants are turned into decisions
///
/// Holds no state of its own; grants are looked up through the ledger on
/// every call. Any lookup failure is returned as an error, never as allow.
#[derive(Clone)]
pub struct AccessAuthorizer {
    ledger: ShareLedger,
}

impl AccessAuthorizer {
    pub fn new(ledger: ShareLedger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &ShareLedger {
        &self.ledger
    }

    /// Ownership check shared by every owner-only operation
    pub fn owns(file: &File, user: UserId) -> bool {
        file.owner == user
    }

    /// Decide whether `user` may perform `access` on `file`
    pub async fn permits(&self, file: &File, user: UserId, access: Access) -> AuthResult<bool> {
        let owner = Self::owns(file, user);
        let allowed = owner
            || match access {
                Access::ManageShares | Access::Delete => false,
                Access::Read => self
                    .ledger
                    .find(file.id, user)
                    .await?
                    .is_some_and(|share| share.permission.allows_read()),
                Access::Write => self
                    .ledger
                    .find(file.id, user)
                    .await?
                    .is_some_and(|share| share.permission.allows_write()),
            };

        debug!(file = %file.id, %user, access = access.as_str(), owner, allowed, "access decision");
        Ok(allowed)
    }

    /// Owner, or holder of a READ or WRITE share
    pub async fn can_read(&self, file: &File, user: UserId) -> AuthResult<bool> {
        self.permits(file, user, Access::Read).await
    }

    /// Owner, or holder of a WRITE share
    pub async fn can_write(&self, file: &File, user: UserId) -> AuthResult<bool> {
        self.permits(file, user, Access::Write).await
    }

    /// Owner only, whatever shares the user holds
    pub fn can_manage_shares(&self, file: &File, user: UserId) -> bool {
        Self::owns(file, user)
    }

    /// Owner only
    pub fn can_delete(&self, file: &File, user: UserId) -> bool {
        Self::owns(file, user)
    }
}
