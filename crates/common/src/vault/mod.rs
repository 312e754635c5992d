//! Secret records, their access control lists, and the engine that runs the
//! create/share/revoke/read protocols over a [`VaultProvider`](crate::provider::VaultProvider).
//!
//! Per record the grant state moves from no entries, to a single entry for
//! the creator, to any number of grantee entries. Revocation removes one
//! entry at a time without rotating the DEK; rewriting the body with
//! [`Vault::update_secret`] does.

mod acl;
mod engine;
mod record;

pub use acl::{Acl, AclEntry, AclError};
pub use engine::{ItemStatus, ReadItem, ReadOutcome, Vault, VaultError};
pub use record::SecretRecord;
