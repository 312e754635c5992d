//! Password-based key derivation for unlocking identity private keys.
//!
//! Two schemes are supported and recorded per identity in [`KdfParams`]:
//!
//! - `argon2id`: memory-hard, the default for new identities
//! - `keyed_hash`: BLAKE3 keyed hash of the password under the salt. A single
//!   fast hash is brute-forceable offline by anyone holding the encrypted key
//!   blob; it is only kept so identities created with it can still log in.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::CryptoError;

/// Size of a KDF salt in bytes
pub const SALT_SIZE: usize = 32;
/// Size of a derived key in bytes
pub const DERIVED_KEY_SIZE: usize = 32;

const DEFAULT_MEMORY_KIB: u32 = 65_536; // 64 MiB
const DEFAULT_ITERATIONS: u32 = 3;
const DEFAULT_PARALLELISM: u32 = 1;

/// Which password KDF an identity was created with, and its cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algo", rename_all = "snake_case")]
pub enum KdfParams {
    Argon2id {
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    },
    KeyedHash,
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams::Argon2id {
            memory_kib: DEFAULT_MEMORY_KIB,
            iterations: DEFAULT_ITERATIONS,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl fmt::Display for KdfParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KdfParams::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => write!(f, "argon2id(m={memory_kib}KiB, t={iterations}, p={parallelism})"),
            KdfParams::KeyedHash => write!(f, "keyed_hash"),
        }
    }
}

impl KdfParams {
    /// The fast keyed-hash scheme used by identities that predate Argon2id.
    pub fn legacy() -> Self {
        KdfParams::KeyedHash
    }

    /// Cheap Argon2id parameters. Only meant for tests and local fixtures.
    pub fn for_tests() -> Self {
        KdfParams::Argon2id {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, KdfParams::KeyedHash)
    }
}

/// A 32-byte key derived from a password. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; DERIVED_KEY_SIZE]);

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DerivedKey").field(&"<redacted>").finish()
    }
}

impl From<[u8; DERIVED_KEY_SIZE]> for DerivedKey {
    fn from(bytes: [u8; DERIVED_KEY_SIZE]) -> Self {
        DerivedKey(bytes)
    }
}

impl DerivedKey {
    pub fn bytes(&self) -> &[u8; DERIVED_KEY_SIZE] {
        &self.0
    }
}

/// Generate a random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Derive a key from `password` and `salt`. Deterministic for fixed inputs.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidLength`] if `salt` is not [`SALT_SIZE`] bytes,
/// or [`CryptoError::Kdf`] if the Argon2 parameters are rejected.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<DerivedKey, CryptoError> {
    let salt: &[u8; SALT_SIZE] = salt
        .try_into()
        .map_err(|_| CryptoError::length("kdf salt", SALT_SIZE, salt.len()))?;

    match params {
        KdfParams::Argon2id {
            memory_kib,
            iterations,
            parallelism,
        } => {
            let params = Params::new(
                *memory_kib,
                *iterations,
                *parallelism,
                Some(DERIVED_KEY_SIZE),
            )
            .map_err(|e| CryptoError::Kdf(e.to_string()))?;
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

            let mut output = [0u8; DERIVED_KEY_SIZE];
            argon2
                .hash_password_into(password, salt, &mut output)
                .map_err(|e| CryptoError::Kdf(e.to_string()))?;
            let key = DerivedKey(output);
            output.zeroize();
            Ok(key)
        }
        KdfParams::KeyedHash => {
            tracing::warn!("deriving key with legacy keyed-hash kdf");
            Ok(DerivedKey(*blake3::keyed_hash(salt, password).as_bytes()))
        }
    }
}
