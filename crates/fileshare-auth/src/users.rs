//! Registered users

use std::sync::Arc;

use tracing::info;

use crate::error::AuthResult;
use crate::metadata::MetadataStore;
use crate::model::{NewUser, User, UserId, unix_now};

/// Registration and lookup of [`User`] records
///
/// Credential hashes are stored as given; verifying them belongs to the
/// boundary.
#[derive(Clone)]
pub struct UserDirectory {
    metadata: Arc<dyn MetadataStore>,
}

impl UserDirectory {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Fails with `AlreadyExists` if the username or email is taken
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        credential_hash: &str,
    ) -> AuthResult<User> {
        let user = self
            .metadata
            .insert_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                credential_hash: credential_hash.to_string(),
                created_at: unix_now(),
            })
            .await?;

        info!(user = %user.id, "registered {}", user.username);
        Ok(user)
    }

    pub async fn get(&self, id: UserId) -> AuthResult<Option<User>> {
        self.metadata.find_user(id).await
    }

    pub async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        self.metadata.find_user_by_username(username).await
    }

    /// All users by ascending id
    pub async fn list(&self) -> AuthResult<Vec<User>> {
        self.metadata.list_users().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::memory::InMemoryMetadataStore;

    fn directory() -> UserDirectory {
        UserDirectory::new(Arc::new(InMemoryMetadataStore::new()))
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let users = directory();

        let alice = users
            .register("alice", "alice@example.com", "hash-a")
            .await
            .unwrap();

        assert_eq!(users.get(alice.id).await.unwrap(), Some(alice.clone()));
        assert_eq!(
            users.find_by_username("alice").await.unwrap(),
            Some(alice)
        );
        assert!(users.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_or_email() {
        let users = directory();
        users
            .register("alice", "alice@example.com", "")
            .await
            .unwrap();

        let same_name = users.register("alice", "other@example.com", "").await;
        assert!(matches!(same_name, Err(AuthError::AlreadyExists(_))));

        let same_email = users.register("alice2", "alice@example.com", "").await;
        assert!(matches!(same_email, Err(AuthError::AlreadyExists(_))));

        assert_eq!(users.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_in_id_order() {
        let users = directory();
        for name in ["carol", "alice", "bob"] {
            users
                .register(name, &format!("{name}@example.com"), "")
                .await
                .unwrap();
        }

        let names: Vec<_> = users
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["carol", "alice", "bob"]);
    }
}
