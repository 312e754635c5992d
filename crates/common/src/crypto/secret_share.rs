//! DEK wrapping for a single recipient using ephemeral-sender ECDH
//!
//! To wrap a DEK for a recipient:
//! 1. **Generate ephemeral keypair**: a one-time X25519 keypair
//! 2. **Perform ECDH**: `shared = X25519(ephemeral_private, recipient_public)`
//! 3. **Derive wrap key**: `wrap_key = BLAKE3-derive-key(WRAP_KEY_CONTEXT, shared)`
//! 4. **Seal**: XChaCha20-Poly1305 over the DEK with a fresh random nonce
//! 5. **Package**: a [`SecretShare`] carrying the sealed DEK, ephemeral public key and nonce
//!
//! The recipient recovers the DEK by computing
//! `X25519(recipient_private, ephemeral_public)`, which equals the sender's
//! shared secret, and running the same derivation.
//!
//! # Security Properties
//!
//! - **Per-wrap ephemerality**: every wrap uses a new ephemeral keypair whose
//!   private half is dropped (and zeroized) before returning
//! - **Receiver authentication**: only the holder of the recipient private key
//!   can derive the wrap key
//! - **No sender authentication**: the sender's long-term key is not involved,
//!   so a share does not prove who produced it. Writes of ACL entries are
//!   authorized by the server instead.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::dek::{aead_open, aead_seal, Dek, DEK_SIZE, NONCE_SIZE, TAG_SIZE};
use super::error::CryptoError;
use super::keys::{PublicKey, SecretKey};

/// Size of a wrapped DEK in bytes (sealed DEK plus tag)
pub const WRAPPED_DEK_SIZE: usize = DEK_SIZE + TAG_SIZE;

/// BLAKE3 derive-key context for ACL wrap keys.
const WRAP_KEY_CONTEXT: &str = "teamvault 2025-01-01 acl entry dek wrap key";

/// Identifies the key-agreement scheme used for a wrapped DEK on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrapAlgo {
    #[default]
    #[serde(rename = "ecdh-x25519")]
    EcdhX25519,
}

impl std::fmt::Display for WrapAlgo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WrapAlgo::EcdhX25519 => write!(f, "ecdh-x25519"),
        }
    }
}

fn wrap_key(
    private: &SecretKey,
    public: &PublicKey,
) -> Result<Zeroizing<[u8; DEK_SIZE]>, CryptoError> {
    let shared = private.diffie_hellman(public)?;
    Ok(Zeroizing::new(blake3::derive_key(
        WRAP_KEY_CONTEXT,
        shared.as_bytes(),
    )))
}

/// A DEK wrapped for exactly one recipient.
///
/// All three parts travel together in an ACL entry. The ephemeral public key
/// is the only way to reconstruct the shared secret, so losing it loses the
/// grant.
///
/// # Examples
///
/// ```ignore
/// // Alice shares a secret's DEK with Bob
/// let dek = Dek::generate();
/// let share = SecretShare::new(&dek, &bob_secret_key.public())?;
///
/// // Bob recovers it with his private key
/// let recovered = share.recover(&bob_secret_key)?;
/// assert_eq!(dek, recovered);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecretShare {
    wrapped_dek: Vec<u8>,
    ephemeral_public: PublicKey,
    wrap_nonce: [u8; NONCE_SIZE],
}

impl SecretShare {
    /// Wrap `dek` so that only the holder of `recipient`'s private key can
    /// recover it.
    ///
    /// # Errors
    ///
    /// Returns an error if `recipient` is a low-order point or sealing fails.
    pub fn new(dek: &Dek, recipient: &PublicKey) -> Result<Self, CryptoError> {
        let ephemeral_private = SecretKey::generate();
        let ephemeral_public = ephemeral_private.public();

        let key = wrap_key(&ephemeral_private, recipient)?;
        drop(ephemeral_private);

        let (wrap_nonce, wrapped_dek) = aead_seal(&key, dek.bytes())?;

        Ok(Self {
            wrapped_dek,
            ephemeral_public,
            wrap_nonce,
        })
    }

    /// Reassemble a share from the raw fields of an ACL entry.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidLength`] if any part has the wrong size.
    pub fn from_parts(
        wrapped_dek: &[u8],
        ephemeral_public: &[u8],
        wrap_nonce: &[u8],
    ) -> Result<Self, CryptoError> {
        if wrapped_dek.len() != WRAPPED_DEK_SIZE {
            return Err(CryptoError::length(
                "wrapped dek",
                WRAPPED_DEK_SIZE,
                wrapped_dek.len(),
            ));
        }
        let ephemeral_public = PublicKey::try_from(ephemeral_public)?;
        let wrap_nonce: [u8; NONCE_SIZE] = wrap_nonce
            .try_into()
            .map_err(|_| CryptoError::length("wrap nonce", NONCE_SIZE, wrap_nonce.len()))?;

        Ok(Self {
            wrapped_dek: wrapped_dek.to_vec(),
            ephemeral_public,
            wrap_nonce,
        })
    }

    /// Recover the wrapped DEK using the recipient's private key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptionFailed`] if the share was created for a
    /// different recipient or any part of it was corrupted.
    pub fn recover(&self, recipient_secret: &SecretKey) -> Result<Dek, CryptoError> {
        let key = wrap_key(recipient_secret, &self.ephemeral_public)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        let unwrapped = Zeroizing::new(aead_open(&key, &self.wrap_nonce, &self.wrapped_dek)?);
        Dek::from_slice(&unwrapped).map_err(|_| CryptoError::DecryptionFailed)
    }

    pub fn wrapped_dek(&self) -> &[u8] {
        &self.wrapped_dek
    }

    pub fn ephemeral_public(&self) -> &PublicKey {
        &self.ephemeral_public
    }

    pub fn wrap_nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.wrap_nonce
    }
}
