use std::collections::BTreeMap;

use uuid::Uuid;

use super::acl::{Acl, AclEntry, AclError};
use super::record::SecretRecord;
use crate::crypto::{self, CryptoError, Dek, KdfParams, SecretKey};
use crate::identity::{
    authorize, can_view_secret, can_view_user, Operation, PermissionDenied, Role, UserId,
    UserIdentity,
};
use crate::provider::{ProviderError, VaultProvider};
use crate::session::{Session, SessionError, SessionStore, TokenPair};

#[derive(Debug, thiserror::Error)]
pub enum VaultError<E> {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Acl(#[from] AclError),
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Provider(#[from] ProviderError<E>),
    #[error("vault already has a super admin")]
    AlreadyBootstrapped,
}

/// Result of decrypting a single record for the session user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Plaintext(Vec<u8>),
    /// The user has an entry without a wrapped key yet
    AccessPending,
    /// The user has no entry on the record
    NoAccess,
}

impl ReadOutcome {
    pub fn plaintext(&self) -> Option<&[u8]> {
        match self {
            ReadOutcome::Plaintext(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Status of one record in a batch read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Revealed(Vec<u8>),
    AccessPending,
    Failed(CryptoError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadItem {
    pub id: Uuid,
    pub title: String,
    pub meta: BTreeMap<String, String>,
    pub status: ItemStatus,
}

fn open_record(
    record: &SecretRecord,
    user: UserId,
    private_key: &SecretKey,
) -> Result<ReadOutcome, CryptoError> {
    let Some(entry) = record.acl().get(user) else {
        return Ok(ReadOutcome::NoAccess);
    };
    let Some(share) = entry.share()? else {
        return Ok(ReadOutcome::AccessPending);
    };
    let dek = share.recover(private_key)?;
    Ok(ReadOutcome::Plaintext(dek.open(record.ciphertext())?))
}

/// The sharing engine.
///
/// Wraps a [`VaultProvider`] and runs every protocol step on the client:
/// DEKs are generated, wrapped and unwrapped here and never handed to the
/// provider in the clear. Each operation takes the caller's [`Session`]
/// explicitly and checks the caller's role before doing any work.
#[derive(Debug, Clone)]
pub struct Vault<P: VaultProvider> {
    provider: P,
}

impl<P: VaultProvider> Vault<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /* Users */

    /// Create the first super admin of an empty vault.
    pub async fn bootstrap(
        &self,
        email: &str,
        team: &str,
        password: &str,
        kdf_params: KdfParams,
    ) -> Result<UserIdentity, VaultError<P::Error>> {
        crypto::ready().await?;
        let users = self.provider.list_users().await?;
        if users.iter().any(|u| u.role == Role::SuperAdmin) {
            return Err(VaultError::AlreadyBootstrapped);
        }

        let identity = self
            .insert_new_user(email, Role::SuperAdmin, team, password, kdf_params)
            .await?;
        tracing::info!(user = %identity.id, "bootstrapped super admin");
        Ok(identity)
    }

    pub async fn register_user(
        &self,
        session: &Session,
        email: &str,
        role: Role,
        team: &str,
        password: &str,
        kdf_params: KdfParams,
    ) -> Result<UserIdentity, VaultError<P::Error>> {
        crypto::ready().await?;
        authorize(session.role, Operation::ManageUsers)?;

        let identity = self
            .insert_new_user(email, role, team, password, kdf_params)
            .await?;
        tracing::info!(user = %identity.id, %role, by = %session.user_id, "registered user");
        Ok(identity)
    }

    /// Generate key material and store the identity under a
    /// provider-assigned id.
    async fn insert_new_user(
        &self,
        email: &str,
        role: Role,
        team: &str,
        password: &str,
        kdf_params: KdfParams,
    ) -> Result<UserIdentity, VaultError<P::Error>> {
        // Fail before the KDF runs; insert_user is still the authority
        if self.provider.find_user_by_email(email).await?.is_some() {
            return Err(VaultError::Provider(ProviderError::UserExists(
                email.to_string(),
            )));
        }
        let (mut identity, _) =
            UserIdentity::register(UserId::UNASSIGNED, email, role, team, password, kdf_params)?;
        identity.id = self.provider.insert_user(identity.clone()).await?;
        Ok(identity)
    }

    pub async fn list_users(
        &self,
        session: &Session,
    ) -> Result<Vec<UserIdentity>, VaultError<P::Error>> {
        authorize(session.role, Operation::ListUsers)?;
        let users = self.provider.list_users().await?;
        Ok(users
            .into_iter()
            .filter(|u| can_view_user(session.role, session.user_id, &session.team, u))
            .collect())
    }

    /// Unlock the user's private key and store a new session.
    ///
    /// An unknown email and a wrong password both fail with
    /// [`CryptoError::AuthenticationFailed`].
    pub async fn login<S>(
        &self,
        store: &S,
        email: &str,
        password: &str,
        tokens: TokenPair,
    ) -> Result<Session, VaultError<P::Error>>
    where
        S: SessionStore + ?Sized,
    {
        crypto::ready().await?;
        let user = self
            .provider
            .find_user_by_email(email)
            .await?
            .ok_or(CryptoError::AuthenticationFailed)?;
        let private_key = user.unlock(password)?;

        let session = Session::new(tokens, user.id, user.role, user.team, private_key);
        store.save(&session).await?;
        tracing::info!(user = %session.user_id, role = %session.role, "logged in");
        Ok(session)
    }

    /// Drop every session key, including the cached private key.
    pub async fn logout<S>(&self, store: &S) -> Result<(), VaultError<P::Error>>
    where
        S: SessionStore + ?Sized,
    {
        store.clear().await?;
        tracing::info!("logged out");
        Ok(())
    }

    /* Secrets */

    /// Encrypt `plaintext` under a fresh DEK and store it with a single ACL
    /// entry for the creator.
    pub async fn create_secret(
        &self,
        session: &Session,
        title: &str,
        meta: BTreeMap<String, String>,
        plaintext: &[u8],
        assigned_to_team_ids: Vec<String>,
    ) -> Result<SecretRecord, VaultError<P::Error>> {
        crypto::ready().await?;
        authorize(session.role, Operation::CreateSecret)?;
        let private_key = session.require_key()?;

        let dek = Dek::generate();
        let ciphertext = dek.seal(plaintext)?.to_blob();
        let mut record =
            SecretRecord::new(title, meta, ciphertext, assigned_to_team_ids, Acl::default());
        let owner_entry = AclEntry::wrap(
            session.user_id,
            &dek,
            &private_key.public(),
            record.key_version(),
            session.user_id,
        )?;
        record.acl_mut().upsert(owner_entry);

        self.provider.put_secret(record.clone()).await?;
        tracing::debug!(secret = %record.id(), owner = %session.user_id, "created secret");
        Ok(record)
    }

    /// Records the session user should see.
    pub async fn list_secrets(
        &self,
        session: &Session,
    ) -> Result<Vec<SecretRecord>, VaultError<P::Error>> {
        authorize(session.role, Operation::ReadSecret)?;
        let records = self.provider.list_secrets().await?;
        Ok(records
            .into_iter()
            .filter(|r| can_view_secret(session.role, session.user_id, &session.team, r))
            .collect())
    }

    /// Fetch one record, if the session user may see it.
    pub async fn get_secret(
        &self,
        session: &Session,
        secret_id: Uuid,
    ) -> Result<SecretRecord, VaultError<P::Error>> {
        authorize(session.role, Operation::ReadSecret)?;
        let record = self.provider.get_secret(secret_id).await?;
        if !can_view_secret(session.role, session.user_id, &session.team, &record) {
            return Err(AclError::NoAccess(session.user_id).into());
        }
        Ok(record)
    }

    /// Wrap the record's DEK for each grantee, replacing any entry they
    /// already had. Entries of other grantees are left untouched.
    ///
    /// The caller must hold a complete entry; all grantee keys are resolved
    /// before anything is persisted.
    pub async fn share_secret(
        &self,
        session: &Session,
        secret_id: Uuid,
        grantees: &[UserId],
    ) -> Result<SecretRecord, VaultError<P::Error>> {
        crypto::ready().await?;
        authorize(session.role, Operation::ShareSecret)?;
        let private_key = session.require_key()?;

        let mut record = self.provider.get_secret(secret_id).await?;
        let share = record
            .acl()
            .complete_entry(session.user_id)?
            .share()?
            .ok_or(AclError::Incomplete(session.user_id))?;
        let dek = share.recover(private_key)?;

        let key_version = record.key_version();
        let mut acl = record.acl().clone();
        for &grantee in grantees {
            let public_key = self.provider.public_key(grantee).await?;
            let entry = AclEntry::wrap(grantee, &dek, &public_key, key_version, session.user_id)?;
            if acl.upsert(entry).is_some() {
                tracing::debug!(secret = %secret_id, %grantee, "replaced acl entry");
            } else {
                tracing::debug!(secret = %secret_id, %grantee, "added acl entry");
            }
        }

        self.provider.patch_acl(secret_id, acl.clone()).await?;
        record.set_acl(acl);
        Ok(record)
    }

    /// Record grantees as members without issuing wrapped keys. Grantees
    /// that already have an entry are skipped.
    pub async fn grant_pending(
        &self,
        session: &Session,
        secret_id: Uuid,
        grantees: &[UserId],
    ) -> Result<SecretRecord, VaultError<P::Error>> {
        authorize(session.role, Operation::ShareSecret)?;

        let mut record = self.provider.get_secret(secret_id).await?;
        let key_version = record.key_version();
        let mut acl = record.acl().clone();
        for &grantee in grantees {
            if acl.contains(grantee) {
                continue;
            }
            self.provider.get_user(grantee).await?;
            acl.upsert(AclEntry::pending(grantee, key_version, session.user_id));
            tracing::debug!(secret = %secret_id, %grantee, "added pending acl entry");
        }

        self.provider.patch_acl(secret_id, acl.clone()).await?;
        record.set_acl(acl);
        Ok(record)
    }

    /// Remove the grantee's entry. A no-op if there is none.
    ///
    /// The DEK is not rotated. A grantee who kept an unwrapped DEK can still
    /// open the current ciphertext until the body is rewritten with
    /// [`Vault::update_secret`].
    pub async fn revoke_access(
        &self,
        session: &Session,
        secret_id: Uuid,
        grantee: UserId,
    ) -> Result<SecretRecord, VaultError<P::Error>> {
        authorize(session.role, Operation::RevokeAccess)?;

        let mut record = self.provider.get_secret(secret_id).await?;
        if record.acl_mut().remove(grantee).is_some() {
            self.provider
                .patch_acl(secret_id, record.acl().clone())
                .await?;
            tracing::debug!(secret = %secret_id, %grantee, "revoked acl entry");
        } else {
            tracing::debug!(secret = %secret_id, %grantee, "no acl entry to revoke");
        }
        Ok(record)
    }

    /// Decrypt one record with the session's private key.
    ///
    /// Missing and pending entries are outcomes, not errors. A wrapped key or
    /// body that fails to authenticate is an error for this record only.
    pub async fn read_secret(
        &self,
        session: &Session,
        record: &SecretRecord,
    ) -> Result<ReadOutcome, VaultError<P::Error>> {
        crypto::ready().await?;
        authorize(session.role, Operation::ReadSecret)?;
        let private_key = session.require_key()?;
        Ok(open_record(record, session.user_id, private_key)?)
    }

    /// Decrypt every visible record the session user holds an entry for.
    ///
    /// Records are processed one at a time and a failure on one record never
    /// affects the others. Records without an entry for the user are left
    /// out of the result.
    pub async fn read_all(&self, session: &Session) -> Result<Vec<ReadItem>, VaultError<P::Error>> {
        crypto::ready().await?;
        let private_key = session.require_key()?;
        let records = self.list_secrets(session).await?;

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let status = match open_record(&record, session.user_id, private_key) {
                Ok(ReadOutcome::NoAccess) => continue,
                Ok(ReadOutcome::AccessPending) => ItemStatus::AccessPending,
                Ok(ReadOutcome::Plaintext(bytes)) => ItemStatus::Revealed(bytes),
                Err(e) => {
                    tracing::warn!(secret = %record.id(), "failed to decrypt secret: {e}");
                    ItemStatus::Failed(e)
                }
            };
            items.push(ReadItem {
                id: *record.id(),
                title: record.title().to_string(),
                meta: record.meta().clone(),
                status,
            });
        }
        Ok(items)
    }

    /// Re-encrypt the body under a fresh DEK and re-wrap it for every grantee
    /// with a complete entry. Pending entries stay pending. Bumps the
    /// record's key version.
    pub async fn update_secret(
        &self,
        session: &Session,
        secret_id: Uuid,
        plaintext: &[u8],
    ) -> Result<SecretRecord, VaultError<P::Error>> {
        crypto::ready().await?;
        authorize(session.role, Operation::UpdateSecret)?;

        let mut record = self.provider.get_secret(secret_id).await?;
        let dek = Dek::generate();
        let ciphertext = dek.seal(plaintext)?.to_blob();
        let key_version = record.key_version() + 1;

        let mut acl = Acl::default();
        for entry in record.acl() {
            if !entry.is_complete() {
                acl.upsert(entry.clone());
                continue;
            }
            let public_key = self.provider.public_key(entry.grantee()).await?;
            acl.upsert(AclEntry::wrap(
                entry.grantee(),
                &dek,
                &public_key,
                key_version,
                entry.granted_by(),
            )?);
        }

        record.rekey(ciphertext, acl, key_version);
        self.provider.put_secret(record.clone()).await?;
        tracing::debug!(secret = %secret_id, key_version, "rotated secret dek");
        Ok(record)
    }

    pub async fn delete_secret(
        &self,
        session: &Session,
        secret_id: Uuid,
    ) -> Result<(), VaultError<P::Error>> {
        authorize(session.role, Operation::DeleteSecret)?;
        self.provider.delete_secret(secret_id).await?;
        tracing::debug!(secret = %secret_id, "deleted secret");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::provider::MemoryVaultProvider;
    use crate::session::MemorySessionStore;

    fn tokens() -> TokenPair {
        TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        }
    }

    async fn setup() -> (Vault<MemoryVaultProvider>, Session) {
        let vault = Vault::new(MemoryVaultProvider::new());
        vault
            .bootstrap("root@example.com", "ops", "pw", KdfParams::for_tests())
            .await
            .unwrap();
        let session = vault
            .login(
                &MemorySessionStore::new(),
                "root@example.com",
                "pw",
                tokens(),
            )
            .await
            .unwrap();
        (vault, session)
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let (vault, session) = setup().await;
        let record = vault
            .create_secret(&session, "db", BTreeMap::new(), b"hunter2", vec![])
            .await
            .unwrap();
        assert_eq!(record.acl().len(), 1);
        assert!(record.acl().get(session.user_id).unwrap().is_complete());

        let outcome = vault.read_secret(&session, &record).await.unwrap();
        assert_eq!(outcome.plaintext(), Some(b"hunter2".as_slice()));
    }

    #[tokio::test]
    async fn test_bootstrap_only_once() {
        let (vault, _) = setup().await;
        let result = vault
            .bootstrap("other@example.com", "ops", "pw", KdfParams::for_tests())
            .await;
        assert!(matches!(result, Err(VaultError::AlreadyBootstrapped)));
    }

    #[tokio::test]
    async fn test_corrupted_wrapped_key_fails_item() {
        let (vault, session) = setup().await;
        let mut record = vault
            .create_secret(&session, "db", BTreeMap::new(), b"hunter2", vec![])
            .await
            .unwrap();
        let enc_dek = record
            .acl_mut()
            .get_mut(session.user_id)
            .unwrap()
            .enc_dek_mut()
            .unwrap();
        enc_dek[0] ^= 0xff;

        let result = vault.read_secret(&session, &record).await;
        assert!(matches!(
            result,
            Err(VaultError::Crypto(CryptoError::DecryptionFailed))
        ));
    }

    #[tokio::test]
    async fn test_truncated_wrapped_key_fails_item() {
        let (vault, session) = setup().await;
        let mut record = vault
            .create_secret(&session, "db", BTreeMap::new(), b"hunter2", vec![])
            .await
            .unwrap();
        record
            .acl_mut()
            .get_mut(session.user_id)
            .unwrap()
            .enc_dek_mut()
            .unwrap()
            .truncate(10);

        let result = vault.read_secret(&session, &record).await;
        assert!(matches!(
            result,
            Err(VaultError::Crypto(CryptoError::DecryptionFailed))
        ));

        // The same entry also blocks sharing onward with the same error
        vault.provider().put_secret(record.clone()).await.unwrap();
        let result = vault
            .share_secret(&session, *record.id(), &[session.user_id])
            .await;
        assert!(matches!(
            result,
            Err(VaultError::Crypto(CryptoError::DecryptionFailed))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_get_distinct_ids() {
        let (vault, session) = setup().await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let vault = vault.clone();
                let session = session.clone();
                tokio::spawn(async move {
                    vault
                        .register_user(
                            &session,
                            &format!("user{i}@example.com"),
                            Role::User,
                            "ops",
                            "pw",
                            KdfParams::for_tests(),
                        )
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut registered = Vec::new();
        for handle in handles {
            registered.push(handle.await.unwrap());
        }
        let users = vault.provider().list_users().await.unwrap();
        assert_eq!(users.len(), 9);
        for identity in registered {
            let stored = vault.provider().get_user(identity.id).await.unwrap();
            assert_eq!(stored.email, identity.email);
            assert_eq!(stored.public_key, identity.public_key);
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (vault, session) = setup().await;
        let result = vault
            .register_user(
                &session,
                "ROOT@example.com",
                Role::User,
                "ops",
                "pw",
                KdfParams::for_tests(),
            )
            .await;
        assert!(matches!(
            result,
            Err(VaultError::Provider(ProviderError::UserExists(_)))
        ));
    }

    #[tokio::test]
    async fn test_locked_session_cannot_create() {
        let (vault, mut session) = setup().await;
        session.lock();
        let result = vault
            .create_secret(&session, "db", BTreeMap::new(), b"x", vec![])
            .await;
        assert!(matches!(
            result,
            Err(VaultError::Session(SessionError::SessionExpired))
        ));
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let (vault, _) = setup().await;
        let result = vault
            .login(&MemorySessionStore::new(), "nobody@example.com", "pw", tokens())
            .await;
        assert!(matches!(
            result,
            Err(VaultError::Crypto(CryptoError::AuthenticationFailed))
        ));
    }
}
