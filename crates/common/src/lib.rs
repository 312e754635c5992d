/**
 * Cryptographic types and operations.
 *  - X25519 keypairs and ECDH
 *  - Per-secret data keys and XChaCha20-Poly1305 sealing
 *  - Key wrapping for a single recipient
 *  - Password key derivation
 */
pub mod crypto;
/**
 * User identities, password-protected private keys,
 *  and the role checks every operation goes through.
 */
pub mod identity;
/**
 * Storage interface for identities and encrypted
 *  records, plus an in-memory implementation.
 */
pub mod provider;
/**
 * Explicit session state, its persistence,
 *  and single-flight access token refresh.
 */
pub mod session;
/**
 * Secret records, ACLs and the sharing engine.
 */
pub mod vault;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{ready, CryptoError, Dek, KdfParams, PublicKey, SecretKey};
    pub use crate::identity::{Operation, PermissionDenied, Role, UserId, UserIdentity};
    pub use crate::provider::{MemoryVaultProvider, ProviderError, VaultProvider};
    pub use crate::session::{
        AuthProvider, MemorySessionStore, Session, SessionError, SessionStore, TokenPair,
        TokenRefresher,
    };
    pub use crate::vault::{
        Acl, AclEntry, AclError, ItemStatus, ReadItem, ReadOutcome, SecretRecord, Vault,
        VaultError,
    };
    pub use crate::version::build_info;
}
