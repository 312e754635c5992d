//! File-backed vault provider and session store
//!
//! Both persist pretty-printed JSON and replace their file atomically on
//! every write. The vault file plays the role of the server: it only ever
//! holds identities, ciphertext and wrapped keys. The session file holds the
//! unlocked private key while logged in and is restricted to the owner.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use common::identity::{UserId, UserIdentity};
use common::provider::{ProviderError, VaultProvider};
use common::session::{Session, SessionError, SessionStore};
use common::vault::{Acl, SecretRecord};

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, FileStoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T, private: bool) -> Result<(), FileStoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    if private {
        restrict_permissions(&tmp).await?;
    }
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), std::io::Error> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), std::io::Error> {
    Ok(())
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultFile {
    #[serde(default)]
    users: Vec<UserIdentity>,
    #[serde(default)]
    secrets: Vec<SecretRecord>,
}

/// Vault provider persisting to a single JSON file
#[derive(Debug, Clone)]
pub struct FileVaultProvider {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

type ProviderResult<T> = Result<T, ProviderError<FileStoreError>>;

impl FileVaultProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load(&self) -> ProviderResult<VaultFile> {
        Ok(read_json(&self.path).await?)
    }

    async fn save(&self, file: &VaultFile) -> ProviderResult<()> {
        Ok(write_json(&self.path, file, false).await?)
    }
}

#[async_trait]
impl VaultProvider for FileVaultProvider {
    type Error = FileStoreError;

    async fn get_user(&self, id: UserId) -> ProviderResult<UserIdentity> {
        self.load()
            .await?
            .users
            .into_iter()
            .find(|u| u.id == id)
            .ok_or(ProviderError::UserNotFound(id))
    }

    async fn find_user_by_email(&self, email: &str) -> ProviderResult<Option<UserIdentity>> {
        Ok(self
            .load()
            .await?
            .users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn list_users(&self) -> ProviderResult<Vec<UserIdentity>> {
        Ok(self.load().await?.users)
    }

    async fn insert_user(&self, mut user: UserIdentity) -> ProviderResult<UserId> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        if file
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ProviderError::UserExists(user.email));
        }
        let last = file.users.iter().map(|u| u.id.0).max().unwrap_or(0);
        let id = UserId(last + 1);
        user.id = id;
        file.users.push(user);
        self.save(&file).await?;
        Ok(id)
    }

    async fn get_secret(&self, id: Uuid) -> ProviderResult<SecretRecord> {
        self.load()
            .await?
            .secrets
            .into_iter()
            .find(|r| r.id() == &id)
            .ok_or(ProviderError::SecretNotFound(id))
    }

    async fn list_secrets(&self) -> ProviderResult<Vec<SecretRecord>> {
        Ok(self.load().await?.secrets)
    }

    async fn put_secret(&self, record: SecretRecord) -> ProviderResult<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        match file.secrets.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => file.secrets.push(record),
        }
        self.save(&file).await
    }

    async fn patch_acl(&self, id: Uuid, acl: Acl) -> ProviderResult<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let record = file
            .secrets
            .iter_mut()
            .find(|r| r.id() == &id)
            .ok_or(ProviderError::SecretNotFound(id))?;
        record.set_acl(acl);
        self.save(&file).await
    }

    async fn delete_secret(&self, id: Uuid) -> ProviderResult<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let before = file.secrets.len();
        file.secrets.retain(|r| r.id() != &id);
        if file.secrets.len() == before {
            return Err(ProviderError::SecretNotFound(id));
        }
        self.save(&file).await
    }
}

/// Session store persisting to a JSON object of string keys
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load_map(&self) -> Result<BTreeMap<String, String>, SessionError> {
        read_json(&self.path)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))
    }

    async fn save_map(
        &self,
        map: &BTreeMap<String, String>,
    ) -> Result<(), SessionError> {
        write_json(&self.path, map, true)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.load_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), SessionError> {
        let _guard = self.lock.lock().await;
        let mut map = self.load_map().await?;
        map.insert(key.to_string(), value);
        self.save_map(&map).await
    }

    async fn remove(&self, key: &str) -> Result<(), SessionError> {
        let _guard = self.lock.lock().await;
        let mut map = self.load_map().await?;
        if map.remove(key).is_some() {
            self.save_map(&map).await?;
        }
        Ok(())
    }
    /// Replace the whole file in one atomic write.
    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let map: BTreeMap<String, String> = session
            .entries()?
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let _guard = self.lock.lock().await;
        self.save_map(&map).await
    }

    async fn clear(&self) -> Result<(), SessionError> {
        let _guard = self.lock.lock().await;
        self.save_map(&BTreeMap::new()).await
    }
}
