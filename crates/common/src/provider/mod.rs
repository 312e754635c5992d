use std::fmt::Debug;

use async_trait::async_trait;
use uuid::Uuid;

use crate::crypto::PublicKey;
use crate::identity::{UserId, UserIdentity};
use crate::vault::{Acl, SecretRecord};

mod memory;

pub use memory::{MemoryVaultProvider, MemoryVaultProviderError};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError<T> {
    /// Backend-specific failure
    #[error("unhandled vault provider error: {0}")]
    Provider(#[from] T),
    /// The grantee exists but has no usable public key, or does not exist
    #[error("no public key on file for user {0}")]
    KeyNotFound(UserId),
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    #[error("secret not found: {0}")]
    SecretNotFound(Uuid),
    /// A user with this email is already registered
    #[error("user already exists: {0}")]
    UserExists(String),
}

/// Server-side storage for identities and encrypted secret records.
///
/// Implementations only ever see ciphertext, wrapped keys and public keys.
/// Authorization is enforced by the caller before any method is invoked.
#[async_trait]
pub trait VaultProvider: Send + Sync + Debug + Clone + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch a user by id
    ///
    /// Should fail with `Err(ProviderError::UserNotFound)` if no such user exists
    async fn get_user(&self, id: UserId) -> Result<UserIdentity, ProviderError<Self::Error>>;

    /// Look a user up by login email
    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserIdentity>, ProviderError<Self::Error>>;

    async fn list_users(&self) -> Result<Vec<UserIdentity>, ProviderError<Self::Error>>;

    /// Store a newly registered identity and return the id assigned to it
    ///
    /// The id on `user` is ignored. Assigning the id and checking the email
    ///  must happen atomically, so two concurrent inserts never share an id.
    ///
    /// Should fail with `Err(ProviderError::UserExists)` if a user already
    ///  holds the same email (case-insensitive)
    async fn insert_user(&self, user: UserIdentity) -> Result<UserId, ProviderError<Self::Error>>;

    /// Resolve the public key a DEK should be wrapped for
    async fn public_key(&self, id: UserId) -> Result<PublicKey, ProviderError<Self::Error>> {
        match self.get_user(id).await {
            Ok(user) => Ok(user.public_key),
            Err(ProviderError::UserNotFound(id)) => Err(ProviderError::KeyNotFound(id)),
            Err(e) => Err(e),
        }
    }

    async fn get_secret(&self, id: Uuid) -> Result<SecretRecord, ProviderError<Self::Error>>;

    async fn list_secrets(&self) -> Result<Vec<SecretRecord>, ProviderError<Self::Error>>;

    /// Persist a whole record, creating or replacing it
    async fn put_secret(&self, record: SecretRecord) -> Result<(), ProviderError<Self::Error>>;

    /// Replace only the ACL of an existing record
    ///
    /// Should fail with `Err(ProviderError::SecretNotFound)` if the record
    ///  does not exist
    async fn patch_acl(&self, id: Uuid, acl: Acl) -> Result<(), ProviderError<Self::Error>>;

    /// Delete a record. Deleting a missing record is an error.
    async fn delete_secret(&self, id: Uuid) -> Result<(), ProviderError<Self::Error>>;
}
