/// Errors raised by the cryptographic primitives.
///
/// AEAD failures are split by what they mean to the caller:
/// [`CryptoError::AuthenticationFailed`] is only ever produced while unlocking a
/// private key with a password-derived key (i.e. the password was wrong), while
/// [`CryptoError::DecryptionFailed`] covers secret bodies and wrapped DEKs
/// (tampering, corruption, or the wrong key).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("authentication failed: wrong password or corrupted private key blob")]
    AuthenticationFailed,
    #[error("decryption failed: ciphertext was tampered with or the key does not match")]
    DecryptionFailed,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("invalid {what} length, expected {expected}, got {got}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("key derivation failed: {0}")]
    Kdf(String),
    #[error("crypto primitives failed their readiness check: {0}")]
    NotReady(String),
}

impl CryptoError {
    pub(crate) fn length(what: &'static str, expected: usize, got: usize) -> Self {
        CryptoError::InvalidLength {
            what,
            expected,
            got,
        }
    }
}
