use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{ProviderError, VaultProvider};
use crate::identity::{UserId, UserIdentity};
use crate::vault::{Acl, SecretRecord};

/// In-memory vault provider using BTreeMaps
#[derive(Debug, Clone)]
pub struct MemoryVaultProvider {
    inner: Arc<RwLock<MemoryVaultProviderInner>>,
}

#[derive(Debug, Default)]
struct MemoryVaultProviderInner {
    users: BTreeMap<UserId, UserIdentity>,
    /// Records in creation order, so listings are stable
    secrets: Vec<SecretRecord>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryVaultProviderError {
    #[error("memory provider error: {0}")]
    Internal(String),
}

type Result<T> = std::result::Result<T, ProviderError<MemoryVaultProviderError>>;

impl MemoryVaultProvider {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryVaultProviderInner::default())),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryVaultProviderInner>> {
        self.inner.read().map_err(|e| {
            ProviderError::Provider(MemoryVaultProviderError::Internal(format!(
                "failed to acquire read lock: {}",
                e
            )))
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryVaultProviderInner>> {
        self.inner.write().map_err(|e| {
            ProviderError::Provider(MemoryVaultProviderError::Internal(format!(
                "failed to acquire write lock: {}",
                e
            )))
        })
    }
}

impl Default for MemoryVaultProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VaultProvider for MemoryVaultProvider {
    type Error = MemoryVaultProviderError;

    async fn get_user(&self, id: UserId) -> Result<UserIdentity> {
        self.read()?
            .users
            .get(&id)
            .cloned()
            .ok_or(ProviderError::UserNotFound(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserIdentity>> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn insert_user(&self, mut user: UserIdentity) -> Result<UserId> {
        let mut inner = self.write()?;
        if inner
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ProviderError::UserExists(user.email));
        }
        let last = inner.users.keys().next_back().map(|id| id.0).unwrap_or(0);
        let id = UserId(last + 1);
        user.id = id;
        inner.users.insert(id, user);
        Ok(id)
    }

    async fn get_secret(&self, id: Uuid) -> Result<SecretRecord> {
        self.read()?
            .secrets
            .iter()
            .find(|r| r.id() == &id)
            .cloned()
            .ok_or(ProviderError::SecretNotFound(id))
    }

    async fn list_secrets(&self) -> Result<Vec<SecretRecord>> {
        Ok(self.read()?.secrets.clone())
    }

    async fn put_secret(&self, record: SecretRecord) -> Result<()> {
        let mut inner = self.write()?;
        match inner.secrets.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => inner.secrets.push(record),
        }
        Ok(())
    }

    async fn patch_acl(&self, id: Uuid, acl: Acl) -> Result<()> {
        let mut inner = self.write()?;
        let record = inner
            .secrets
            .iter_mut()
            .find(|r| r.id() == &id)
            .ok_or(ProviderError::SecretNotFound(id))?;
        record.set_acl(acl);
        Ok(())
    }

    async fn delete_secret(&self, id: Uuid) -> Result<()> {
        let mut inner = self.write()?;
        let idx = inner
            .secrets
            .iter()
            .position(|r| r.id() == &id)
            .ok_or(ProviderError::SecretNotFound(id))?;
        inner.secrets.remove(idx);
        Ok(())
    }
}
