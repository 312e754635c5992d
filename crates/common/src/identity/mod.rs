//! User identities and key material
//!
//! - [`UserIdentity`]: the server-side record of a user, including their
//!   public key and their password-protected private key
//! - [`key_material`]: keypair generation and private key protection
//! - [`policy`]: role checks for every privileged operation

pub mod key_material;
pub mod policy;
mod user;

pub use key_material::{
    derive_key, generate_identity_keypair, protect_private_key, unlock_private_key,
};
pub use policy::{authorize, can_view_secret, can_view_user, Operation, PermissionDenied};
pub use user::{Role, UnknownRole, UserId, UserIdentity};
