//! Cryptographic primitives for teamvault
//!
//! This module provides the cryptographic foundation for the vault's security model:
//!
//! - **Identity**: X25519 keypairs ([`SecretKey`]/[`PublicKey`]) per user
//! - **Encryption**: XChaCha20-Poly1305 for secret bodies, one [`Dek`] per record
//! - **Key Wrapping**: ephemeral-sender ECDH to wrap a DEK per grantee ([`SecretShare`])
//! - **Password KDF**: Argon2id (or the legacy keyed hash) to protect private keys at rest
//!
//! # Security Model
//!
//! ## User Identity
//! Each user has an X25519 keypair. The public half is stored server-side in the
//! clear so owners can wrap keys for them. The private half is stored
//! server-side only as an AEAD ciphertext under a password-derived key, and is
//! unlocked on the client at login.
//!
//! ## Content Encryption
//! Every secret record has its own random DEK. The body is stored as
//! `nonce || ciphertext`, and the DEK itself never leaves the client unwrapped.
//!
//! ## Key Wrapping Protocol
//! To grant a user access to a record:
//! 1. Generate an ephemeral X25519 keypair
//! 2. ECDH between the ephemeral private key and the grantee public key
//! 3. Derive a wrap key from the shared secret with BLAKE3 in derive-key mode
//! 4. Seal the DEK under the wrap key with XChaCha20-Poly1305
//! 5. Store the sealed DEK, the ephemeral public key and the nonce in the ACL entry
//!
//! The grantee repeats steps 2 and 3 with their private key and the stored
//! ephemeral public key to unwrap the DEK.

mod dek;
mod error;
mod kdf;
mod keys;
mod ready;
mod secret_share;

pub use dek::{CipherAlgo, Dek, Sealed, DEK_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::CryptoError;
pub use kdf::{derive_key, generate_salt, DerivedKey, KdfParams, DERIVED_KEY_SIZE, SALT_SIZE};
pub use keys::{PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use ready::{is_ready, ready};
pub use secret_share::{SecretShare, WrapAlgo, WRAPPED_DEK_SIZE};

pub(crate) use dek::{aead_open, aead_seal};
