//! # Users
//!
//! A [`UserIdentity`] is what the server stores for each vault user: contact
//! and authorization attributes next to the user's X25519 public key and an
//! encrypted copy of the matching private key.
//!
//! The private key is sealed under a key derived from the user's password
//! (see [`KdfParams`]). The server never learns the password or the private
//! key; a successful [`UserIdentity::unlock`] is the only password check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use zeroize::Zeroizing;

use super::key_material::{generate_identity_keypair, protect_private_key, unlock_private_key};
use crate::crypto::{
    derive_key, generate_salt, CryptoError, KdfParams, PublicKey, SecretKey, NONCE_SIZE, SALT_SIZE,
};

/// Numeric user id assigned by the server.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl UserId {
    /// Placeholder for an identity the provider has not stored yet
    pub const UNASSIGNED: UserId = UserId(0);
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId(id)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(UserId)
    }
}

/// The role of a user within the vault.
///
/// What each role may do is decided in one place, [`authorize`](super::authorize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Reads secrets shared with them.
    User,
    /// Manages sharing for their team.
    Admin,
    /// Full control over secrets and users.
    SuperAdmin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
            Role::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "super_admin" | "superadmin" | "super-admin" => Ok(Role::SuperAdmin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

fn legacy_kdf() -> KdfParams {
    KdfParams::legacy()
}

/// A vault user as persisted server-side.
///
/// Records written before `kdf_params` existed deserialize with the legacy
/// keyed-hash scheme, which is what they were created with.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub team: String,
    pub public_key: PublicKey,
    #[serde_as(as = "Hex")]
    pub encrypted_private_key: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub kdf_salt: [u8; SALT_SIZE],
    #[serde_as(as = "Hex")]
    pub kdf_nonce: [u8; NONCE_SIZE],
    #[serde(default = "legacy_kdf")]
    pub kdf_params: KdfParams,
}

impl UserIdentity {
    /// Create a new identity protected by `password`.
    ///
    /// Returns the identity to persist and the freshly generated private key,
    /// which the caller may use to start a session without a second unlock.
    pub fn register(
        id: UserId,
        email: impl Into<String>,
        role: Role,
        team: impl Into<String>,
        password: &str,
        kdf_params: KdfParams,
    ) -> Result<(Self, SecretKey), CryptoError> {
        let (public_key, private_key) = generate_identity_keypair();
        let kdf_salt = generate_salt();
        let derived = derive_key(password.as_bytes(), &kdf_salt, &kdf_params)?;
        let (encrypted_private_key, kdf_nonce) = protect_private_key(&private_key, &derived)?;

        let identity = Self {
            id,
            email: email.into(),
            role,
            team: team.into(),
            public_key,
            encrypted_private_key,
            kdf_salt,
            kdf_nonce,
            kdf_params,
        };
        tracing::debug!(role = %identity.role, kdf = %kdf_params, "generated identity key material");
        Ok((identity, private_key))
    }

    /// Recover the private key with `password`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::AuthenticationFailed`] if the password is wrong or
    /// the stored blob was corrupted. The two cases are indistinguishable.
    pub fn unlock(&self, password: &str) -> Result<SecretKey, CryptoError> {
        let password = Zeroizing::new(password.as_bytes().to_vec());
        let derived = derive_key(&password, &self.kdf_salt, &self.kdf_params)?;
        let private_key =
            unlock_private_key(&self.encrypted_private_key, &self.kdf_nonce, &derived)?;
        if private_key.public() != self.public_key {
            tracing::warn!(user = %self.id, "unlocked private key does not match stored public key");
            return Err(CryptoError::AuthenticationFailed);
        }
        Ok(private_key)
    }
}
