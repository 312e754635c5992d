//! Secret body encryption using XChaCha20-Poly1305
//!
//! Every secret record gets its own data-encryption key ([`Dek`]). The body is
//! sealed under that key and stored as a single blob:
//!
//! ```text
//! [ nonce: 24 bytes ][ ciphertext || tag: len(plaintext) + 16 bytes ]
//! ```
//!
//! The DEK itself is never persisted; it only travels wrapped per grantee
//! (see [`SecretShare`](super::SecretShare)).

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::CryptoError;

/// Size of an XChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 24;
/// Size of a DEK in bytes (256 bits)
pub const DEK_SIZE: usize = 32;
/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Identifies the AEAD scheme used for secret bodies on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherAlgo {
    #[default]
    #[serde(rename = "xchacha20-poly1305")]
    XChaCha20Poly1305,
}

impl fmt::Display for CipherAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherAlgo::XChaCha20Poly1305 => write!(f, "xchacha20-poly1305"),
        }
    }
}

pub(crate) fn random_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce);
    nonce
}

/// Seal `plaintext` under a 32-byte key with a fresh random nonce.
pub(crate) fn aead_seal(
    key: &[u8; DEK_SIZE],
    plaintext: &[u8],
) -> Result<([u8; NONCE_SIZE], Vec<u8>), CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = random_nonce();
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    Ok((nonce, ciphertext))
}

/// Open an AEAD ciphertext. Any tag mismatch surfaces as
/// [`CryptoError::DecryptionFailed`]; callers remap it where the failure
/// means something more specific.
pub(crate) fn aead_open(
    key: &[u8; DEK_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// A sealed secret body, split into its nonce and AEAD ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

impl Sealed {
    /// Serialize as `nonce || ciphertext` for storage and transport.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split a stored blob by the fixed nonce length.
    ///
    /// A blob too short to carry a nonce and a tag cannot be authentic, so it
    /// is reported the same way as a tag mismatch.
    pub fn from_blob(blob: &[u8]) -> Result<Self, CryptoError> {
        if blob.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);
        Ok(Self {
            nonce: nonce_bytes,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// A 256-bit data-encryption key for one secret body.
///
/// Lives only transiently in memory during encrypt/decrypt/wrap/unwrap and is
/// zeroized on drop. `Debug` is redacted.
///
/// # Examples
///
/// ```ignore
/// let dek = Dek::generate();
/// let blob = dek.seal(b"p@ssW0rd")?.to_blob();
/// assert_eq!(dek.open(&blob)?, b"p@ssW0rd");
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Dek([u8; DEK_SIZE]);

impl fmt::Debug for Dek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dek").field(&"<redacted>").finish()
    }
}

impl From<[u8; DEK_SIZE]> for Dek {
    fn from(bytes: [u8; DEK_SIZE]) -> Self {
        Dek(bytes)
    }
}

impl Dek {
    /// Generate a new random DEK using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut buff = [0u8; DEK_SIZE];
        rand::rng().fill_bytes(&mut buff);
        let dek = Self(buff);
        buff.zeroize();
        dek
    }

    /// Create a DEK from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `DEK_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        if data.len() != DEK_SIZE {
            return Err(CryptoError::length("dek", DEK_SIZE, data.len()));
        }
        let mut buff = [0u8; DEK_SIZE];
        buff.copy_from_slice(data);
        let dek = Self(buff);
        buff.zeroize();
        Ok(dek)
    }

    pub fn bytes(&self) -> &[u8; DEK_SIZE] {
        &self.0
    }

    /// Encrypt a secret body under this DEK with a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Sealed, CryptoError> {
        let (nonce, ciphertext) = aead_seal(&self.0, plaintext)?;
        Ok(Sealed { nonce, ciphertext })
    }

    /// Decrypt a `nonce || ciphertext` blob produced by [`Dek::seal`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptionFailed`] if the blob is truncated, was
    /// tampered with, or was sealed under another key. No partial plaintext is
    /// ever returned.
    pub fn open(&self, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let sealed = Sealed::from_blob(blob)?;
        aead_open(&self.0, &sealed.nonce, &sealed.ciphertext)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seal_open() {
        let dek = Dek::generate();
        let data = b"hello world, this is a test credential body";

        let blob = dek.seal(data).unwrap().to_blob();
        assert_eq!(blob.len(), NONCE_SIZE + data.len() + TAG_SIZE);

        let opened = dek.open(&blob).unwrap();
        assert_eq!(data.as_slice(), opened.as_slice());
    }

    #[test]
    fn test_empty_body() {
        let dek = Dek::generate();
        let blob = dek.seal(b"").unwrap().to_blob();
        assert_eq!(dek.open(&blob).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let dek = Dek::generate();
        let a = dek.seal(b"same").unwrap();
        let b = dek.seal(b"same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.to_blob(), b.to_blob());
    }

    #[test]
    fn test_tampered_blob_fails() {
        let dek = Dek::generate();
        let mut blob = dek.seal(b"secret body").unwrap().to_blob();
        blob[NONCE_SIZE + 3] ^= 0xFF;
        assert_eq!(dek.open(&blob), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_wrong_dek_fails() {
        let blob = Dek::generate().seal(b"secret body").unwrap().to_blob();
        assert_eq!(
            Dek::generate().open(&blob),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_truncated_blob_fails() {
        let dek = Dek::generate();
        let blob = dek.seal(b"x").unwrap().to_blob();
        assert_eq!(
            dek.open(&blob[..NONCE_SIZE + TAG_SIZE - 1]),
            Err(CryptoError::DecryptionFailed)
        );
        assert_eq!(dek.open(&[]), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_dek_size_validation() {
        assert!(Dek::from_slice(&[1u8; 16]).is_err());
        assert!(Dek::from_slice(&[1u8; 64]).is_err());
        assert!(Dek::from_slice(&[1u8; DEK_SIZE]).is_ok());
    }

    #[test]
    fn test_debug_is_redacted() {
        let dek = Dek::from([7u8; DEK_SIZE]);
        assert_eq!(format!("{:?}", dek), "Dek(\"<redacted>\")");
    }

    #[test]
    fn test_cipher_algo_wire_name() {
        let json = serde_json::to_string(&CipherAlgo::XChaCha20Poly1305).unwrap();
        assert_eq!(json, "\"xchacha20-poly1305\"");
    }
}
