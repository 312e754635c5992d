use zeroize::Zeroizing;

use crate::crypto::{
    aead_open, aead_seal, CryptoError, DerivedKey, PublicKey, SecretKey, NONCE_SIZE,
};

pub use crate::crypto::derive_key;

/// Generate a fresh long-term X25519 identity keypair.
pub fn generate_identity_keypair() -> (PublicKey, SecretKey) {
    let private_key = SecretKey::generate();
    (private_key.public(), private_key)
}

/// Seal a private key under a password-derived key.
///
/// Returns the AEAD ciphertext and the nonce it was sealed with; both are
/// stored on the identity.
pub fn protect_private_key(
    private_key: &SecretKey,
    derived_key: &DerivedKey,
) -> Result<(Vec<u8>, [u8; NONCE_SIZE]), CryptoError> {
    let plaintext = Zeroizing::new(private_key.to_bytes());
    let (nonce, ciphertext) = aead_seal(derived_key.bytes(), plaintext.as_slice())?;
    Ok((ciphertext, nonce))
}

/// Open a sealed private key.
///
/// # Errors
///
/// A tag mismatch is reported as [`CryptoError::AuthenticationFailed`]: with
/// an intact blob it means the password was wrong.
pub fn unlock_private_key(
    ciphertext: &[u8],
    nonce: &[u8],
    derived_key: &DerivedKey,
) -> Result<SecretKey, CryptoError> {
    let nonce: &[u8; NONCE_SIZE] = nonce
        .try_into()
        .map_err(|_| CryptoError::length("private key nonce", NONCE_SIZE, nonce.len()))?;
    let plaintext = Zeroizing::new(
        aead_open(derived_key.bytes(), nonce, ciphertext).map_err(|e| match e {
            CryptoError::DecryptionFailed => CryptoError::AuthenticationFailed,
            other => other,
        })?,
    );
    SecretKey::try_from(plaintext.as_slice())
}
