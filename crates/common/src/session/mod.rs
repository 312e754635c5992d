//! Session state for an authenticated client
//!
//! A [`Session`] is the explicit context every engine operation receives: the
//! caller's tokens, identity attributes and unlocked private key. It is
//! persisted through a [`SessionStore`] under a fixed set of keys which are
//! always cleared together on logout.
//!
//! Access tokens are refreshed through [`TokenRefresher`], which guarantees
//! that concurrent callers holding the same stale token trigger a single
//! refresh.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use zeroize::Zeroizing;

use crate::crypto::SecretKey;
use crate::identity::{Role, UserId};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_ID_KEY: &str = "user_id";
pub const USER_ROLE_KEY: &str = "user_role";
pub const USER_TEAM_KEY: &str = "user_team";
pub const PRIVATE_KEY_KEY: &str = "private_key";

/// Every key a session occupies in its store.
pub const SESSION_KEYS: [&str; 6] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    USER_ID_KEY,
    USER_ROLE_KEY,
    USER_TEAM_KEY,
    PRIVATE_KEY_KEY,
];

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session expired, log in again")]
    SessionExpired,
    #[error("session store error: {0}")]
    Store(String),
    #[error("token refresh failed: {0}")]
    Refresh(String),
}

/// An access/refresh token pair issued by the auth backend.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair").finish_non_exhaustive()
    }
}

/// The authenticated caller.
#[derive(Clone)]
pub struct Session {
    pub tokens: TokenPair,
    pub user_id: UserId,
    pub role: Role,
    pub team: String,
    private_key: Option<SecretKey>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("team", &self.team)
            .field("unlocked", &self.private_key.is_some())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(
        tokens: TokenPair,
        user_id: UserId,
        role: Role,
        team: impl Into<String>,
        private_key: SecretKey,
    ) -> Self {
        Self {
            tokens,
            user_id,
            role,
            team: team.into(),
            private_key: Some(private_key),
        }
    }

    /// The unlocked private key.
    ///
    /// # Errors
    ///
    /// [`SessionError::SessionExpired`] if the key has been dropped.
    pub fn require_key(&self) -> Result<&SecretKey, SessionError> {
        self.private_key.as_ref().ok_or(SessionError::SessionExpired)
    }

    /// The session as store entries, with the private key last.
    pub fn entries(&self) -> Result<Vec<(&'static str, Zeroizing<String>)>, SessionError> {
        let private_key = Zeroizing::new(self.require_key()?.to_hex());
        Ok(vec![
            (ACCESS_TOKEN_KEY, Zeroizing::new(self.tokens.access_token.clone())),
            (REFRESH_TOKEN_KEY, Zeroizing::new(self.tokens.refresh_token.clone())),
            (USER_ID_KEY, Zeroizing::new(self.user_id.to_string())),
            (USER_ROLE_KEY, Zeroizing::new(self.role.to_string())),
            (USER_TEAM_KEY, Zeroizing::new(self.team.clone())),
            (PRIVATE_KEY_KEY, private_key),
        ])
    }

    /// Drop the private key from this session value.
    pub fn lock(&mut self) {
        self.private_key = None;
    }
}

/// Asynchronous key-value storage for session state.
///
/// Implementors provide `get`, `set` and `remove`; saving, loading and
/// clearing a whole [`Session`] are built on top of them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    async fn set(&self, key: &str, value: String) -> Result<(), SessionError>;

    async fn remove(&self, key: &str) -> Result<(), SessionError>;

    /// Write every session key, replacing whatever session was stored.
    ///
    /// The store is cleared first and the private key is written last, so a
    /// save that fails partway loads as [`SessionError::SessionExpired`]
    /// rather than as a mix of two sessions.
    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let entries = session.entries()?;
        self.clear().await?;
        for (key, value) in entries {
            self.set(key, value.to_string()).await?;
        }
        Ok(())
    }

    /// Rebuild the session from the store.
    ///
    /// A missing user or private key means nobody is logged in and yields
    /// [`SessionError::SessionExpired`].
    async fn load(&self) -> Result<Session, SessionError> {
        let user_id = self
            .get(USER_ID_KEY)
            .await?
            .ok_or(SessionError::SessionExpired)?;
        let private_key = Zeroizing::new(
            self.get(PRIVATE_KEY_KEY)
                .await?
                .ok_or(SessionError::SessionExpired)?,
        );

        let user_id = user_id
            .parse::<UserId>()
            .map_err(|e| SessionError::Store(format!("invalid user id: {e}")))?;
        let private_key = SecretKey::from_hex(&private_key)
            .map_err(|e| SessionError::Store(format!("invalid private key: {e}")))?;
        let role = self
            .get(USER_ROLE_KEY)
            .await?
            .ok_or(SessionError::SessionExpired)?
            .parse::<Role>()
            .map_err(|e| SessionError::Store(e.to_string()))?;
        let team = self.get(USER_TEAM_KEY).await?.unwrap_or_default();
        let tokens = TokenPair {
            access_token: self.get(ACCESS_TOKEN_KEY).await?.unwrap_or_default(),
            refresh_token: self.get(REFRESH_TOKEN_KEY).await?.unwrap_or_default(),
        };

        Ok(Session::new(tokens, user_id, role, team, private_key))
    }

    /// Remove every session key.
    async fn clear(&self) -> Result<(), SessionError> {
        for key in SESSION_KEYS {
            self.remove(key).await?;
        }
        Ok(())
    }
}

/// In-memory session store using a HashMap
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), SessionError> {
        self.inner.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SessionError> {
        if let Some(value) = self.inner.write().await.remove(key) {
            drop(Zeroizing::new(value));
        }
        Ok(())
    }
}

/// The backend that exchanges a refresh token for a new token pair.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError>;
}

/// Serializes token refreshes against one session store.
///
/// Callers pass the access token they saw rejected. The first caller through
/// the lock refreshes; everyone queued behind it finds the stored token has
/// already moved on and returns it without calling the backend.
#[derive(Debug)]
pub struct TokenRefresher<A> {
    auth: A,
    lock: Mutex<()>,
}

impl<A: AuthProvider> TokenRefresher<A> {
    pub fn new(auth: A) -> Self {
        Self {
            auth,
            lock: Mutex::new(()),
        }
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    /// Obtain a fresh access token to replace `stale_access_token`.
    ///
    /// # Errors
    ///
    /// [`SessionError::SessionExpired`] if there is no session to refresh. If
    /// the backend rejects the refresh the whole session is cleared and
    /// the backend's error is returned.
    pub async fn refresh<S>(
        &self,
        store: &S,
        stale_access_token: &str,
    ) -> Result<String, SessionError>
    where
        S: SessionStore + ?Sized,
    {
        let _guard = self.lock.lock().await;

        let current = store
            .get(ACCESS_TOKEN_KEY)
            .await?
            .ok_or(SessionError::SessionExpired)?;
        if current != stale_access_token {
            tracing::debug!("access token already refreshed by another caller");
            return Ok(current);
        }

        let refresh_token = store
            .get(REFRESH_TOKEN_KEY)
            .await?
            .ok_or(SessionError::SessionExpired)?;

        match self.auth.refresh(&refresh_token).await {
            Ok(pair) => {
                store
                    .set(ACCESS_TOKEN_KEY, pair.access_token.clone())
                    .await?;
                store.set(REFRESH_TOKEN_KEY, pair.refresh_token).await?;
                tracing::debug!("access token refreshed");
                Ok(pair.access_token)
            }
            Err(e) => {
                tracing::warn!("token refresh failed, clearing session: {e}");
                store.clear().await?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn session() -> Session {
        Session::new(
            TokenPair {
                access_token: "access-1".into(),
                refresh_token: "refresh-1".into(),
            },
            UserId(7),
            Role::Admin,
            "infra",
            SecretKey::generate(),
        )
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = MemorySessionStore::new();
        let session = session();
        store.save(&session).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.user_id, UserId(7));
        assert_eq!(loaded.role, Role::Admin);
        assert_eq!(loaded.team, "infra");
        assert_eq!(loaded.tokens, session.tokens);
        assert_eq!(
            loaded.require_key().unwrap().to_bytes(),
            session.require_key().unwrap().to_bytes()
        );
    }

    #[tokio::test]
    async fn test_clear_removes_every_key() {
        let store = MemorySessionStore::new();
        store.save(&session()).await.unwrap();
        store.clear().await.unwrap();

        for key in SESSION_KEYS {
            assert!(store.get(key).await.unwrap().is_none(), "{key} survived");
        }
        assert!(matches!(
            store.load().await,
            Err(SessionError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_missing_private_key_is_expired() {
        let store = MemorySessionStore::new();
        store.save(&session()).await.unwrap();
        store.remove(PRIVATE_KEY_KEY).await.unwrap();
        assert!(matches!(
            store.load().await,
            Err(SessionError::SessionExpired)
        ));
    }

    /// Session store whose writes fail once `budget` sets have succeeded
    struct FlakyStore {
        inner: MemorySessionStore,
        budget: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl SessionStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<(), SessionError> {
            use std::sync::atomic::Ordering;
            let left = self.budget.load(Ordering::SeqCst);
            if left == 0 {
                return Err(SessionError::Store("disk full".into()));
            }
            self.budget.store(left - 1, Ordering::SeqCst);
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), SessionError> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_save_never_mixes_sessions() {
        let store = FlakyStore {
            inner: MemorySessionStore::new(),
            budget: std::sync::atomic::AtomicUsize::new(usize::MAX),
        };
        store.save(&session()).await.unwrap();

        let mut other = session();
        other.user_id = UserId(8);
        other.private_key = Some(SecretKey::generate());
        store
            .budget
            .store(3, std::sync::atomic::Ordering::SeqCst);
        assert!(store.save(&other).await.is_err());

        // The new user id was written, the old private key must be gone
        assert_eq!(
            store.get(USER_ID_KEY).await.unwrap().as_deref(),
            Some("8")
        );
        assert!(matches!(
            store.load().await,
            Err(SessionError::SessionExpired)
        ));
    }

    #[test]
    fn test_locked_session_requires_key() {
        let mut session = session();
        assert!(session.require_key().is_ok());
        session.lock();
        assert!(matches!(
            session.require_key(),
            Err(SessionError::SessionExpired)
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let rendered = format!("{:?}", session());
        assert!(!rendered.contains("access-1"));
        assert!(!rendered.contains("refresh-1"));
    }
}
