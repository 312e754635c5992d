//! One-shot readiness barrier for the crypto primitives.
//!
//! Engine entry points await [`ready`] before touching any primitive. The first
//! caller runs a small self-test; every later caller returns immediately with
//! the cached result.

use tokio::sync::OnceCell;

use super::dek::Dek;
use super::error::CryptoError;
use super::keys::SecretKey;
use super::secret_share::SecretShare;

static READY: OnceCell<()> = OnceCell::const_new();

const PROBE: &[u8] = b"teamvault readiness probe";

fn self_test() -> Result<(), CryptoError> {
    let alice = SecretKey::generate();
    let bob = SecretKey::generate();
    let ab = alice.diffie_hellman(&bob.public())?;
    let ba = bob.diffie_hellman(&alice.public())?;
    if ab.as_bytes() != ba.as_bytes() {
        return Err(CryptoError::NotReady("x25519 does not commute".into()));
    }

    let dek = Dek::generate();
    let blob = dek.seal(PROBE)?.to_blob();
    if dek.open(&blob)? != PROBE {
        return Err(CryptoError::NotReady("aead round trip mismatch".into()));
    }

    let share = SecretShare::new(&dek, &bob.public())?;
    if share.recover(&bob)? != dek {
        return Err(CryptoError::NotReady("dek wrap round trip mismatch".into()));
    }

    Ok(())
}

/// Wait until the primitives are usable.
///
/// # Errors
///
/// Returns [`CryptoError::NotReady`] if the self-test fails. A failed check is
/// not cached, so the next caller retries it.
pub async fn ready() -> Result<(), CryptoError> {
    READY
        .get_or_try_init(|| async {
            self_test().map_err(|e| match e {
                CryptoError::NotReady(_) => e,
                other => CryptoError::NotReady(other.to_string()),
            })?;
            tracing::debug!("crypto primitives ready");
            Ok::<(), CryptoError>(())
        })
        .await?;
    Ok(())
}

/// Whether [`ready`] has already completed successfully.
pub fn is_ready() -> bool {
    READY.initialized()
}
