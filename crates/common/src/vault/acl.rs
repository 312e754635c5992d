//! # Access control lists
//!
//! Each secret record carries an [`Acl`]: at most one [`AclEntry`] per
//! grantee, kept in insertion order. A complete entry holds the record's DEK
//! wrapped for the grantee (see [`SecretShare`]). An entry with any of its
//! crypto fields missing is *pending*: it records membership but cannot be
//! used to decrypt until someone with access re-shares.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

use crate::crypto::{CryptoError, Dek, SecretShare, WrapAlgo};
use crate::identity::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AclError {
    #[error("user {0} has no access to this secret")]
    NoAccess(UserId),
    #[error("access for user {0} is pending: no wrapped key has been issued yet")]
    Incomplete(UserId),
}

/// One grantee's access to a secret record.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    grantee_user_id: UserId,
    #[serde_as(as = "Option<Base64>")]
    enc_dek: Option<Vec<u8>>,
    wrap_algo: Option<WrapAlgo>,
    key_version: u32,
    granted_by: UserId,
    granted_at: DateTime<Utc>,
    #[serde_as(as = "Option<Base64>")]
    ephemeral_pub: Option<Vec<u8>>,
    #[serde_as(as = "Option<Base64>")]
    wrap_nonce: Option<Vec<u8>>,
}

impl AclEntry {
    /// A complete entry carrying `share` for `grantee`.
    pub fn new(grantee: UserId, share: &SecretShare, key_version: u32, granted_by: UserId) -> Self {
        Self {
            grantee_user_id: grantee,
            enc_dek: Some(share.wrapped_dek().to_vec()),
            wrap_algo: Some(WrapAlgo::EcdhX25519),
            key_version,
            granted_by,
            granted_at: Utc::now(),
            ephemeral_pub: Some(share.ephemeral_public().as_bytes().to_vec()),
            wrap_nonce: Some(share.wrap_nonce().to_vec()),
        }
    }

    /// Wrap `dek` for `recipient` and build a complete entry for `grantee`.
    pub fn wrap(
        grantee: UserId,
        dek: &Dek,
        recipient: &crate::crypto::PublicKey,
        key_version: u32,
        granted_by: UserId,
    ) -> Result<Self, CryptoError> {
        let share = SecretShare::new(dek, recipient)?;
        Ok(Self::new(grantee, &share, key_version, granted_by))
    }

    /// An entry recording membership without any wrapped key.
    pub fn pending(grantee: UserId, key_version: u32, granted_by: UserId) -> Self {
        Self {
            grantee_user_id: grantee,
            enc_dek: None,
            wrap_algo: None,
            key_version,
            granted_by,
            granted_at: Utc::now(),
            ephemeral_pub: None,
            wrap_nonce: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.enc_dek.is_some()
            && self.ephemeral_pub.is_some()
            && self.wrap_nonce.is_some()
            && self.wrap_algo.is_some()
    }

    /// The wrapped DEK, or `None` if the entry is pending.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptionFailed`] if a crypto field is
    /// malformed, the same as a wrapped key that fails to authenticate.
    pub fn share(&self) -> Result<Option<SecretShare>, CryptoError> {
        match (&self.enc_dek, &self.ephemeral_pub, &self.wrap_nonce, &self.wrap_algo) {
            (Some(enc_dek), Some(ephemeral_pub), Some(wrap_nonce), Some(WrapAlgo::EcdhX25519)) => {
                SecretShare::from_parts(enc_dek, ephemeral_pub, wrap_nonce)
                    .map(Some)
                    .map_err(|e| {
                        tracing::debug!(grantee = %self.grantee_user_id, "malformed acl entry: {e}");
                        CryptoError::DecryptionFailed
                    })
            }
            _ => Ok(None),
        }
    }

    pub fn grantee(&self) -> UserId {
        self.grantee_user_id
    }

    pub fn granted_by(&self) -> UserId {
        self.granted_by
    }

    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    pub fn key_version(&self) -> u32 {
        self.key_version
    }

    pub fn wrap_algo(&self) -> Option<WrapAlgo> {
        self.wrap_algo
    }

    pub fn enc_dek(&self) -> Option<&[u8]> {
        self.enc_dek.as_deref()
    }

    pub fn ephemeral_pub(&self) -> Option<&[u8]> {
        self.ephemeral_pub.as_deref()
    }

    pub fn wrap_nonce(&self) -> Option<&[u8]> {
        self.wrap_nonce.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn enc_dek_mut(&mut self) -> Option<&mut Vec<u8>> {
        self.enc_dek.as_mut()
    }
}

/// Grantee entries for one record, unique per grantee, in insertion order.
///
/// Duplicate grantees in serialized input are collapsed on load, with the
/// later entry taking the earlier one's position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AclEntry>", into = "Vec<AclEntry>")]
pub struct Acl(Vec<AclEntry>);

impl From<Vec<AclEntry>> for Acl {
    fn from(entries: Vec<AclEntry>) -> Self {
        let mut acl = Acl::default();
        for entry in entries {
            acl.upsert(entry);
        }
        acl
    }
}

impl From<Acl> for Vec<AclEntry> {
    fn from(acl: Acl) -> Self {
        acl.0
    }
}

impl Acl {
    pub fn get(&self, grantee: UserId) -> Option<&AclEntry> {
        self.0.iter().find(|e| e.grantee_user_id == grantee)
    }

    pub fn contains(&self, grantee: UserId) -> bool {
        self.get(grantee).is_some()
    }

    /// The grantee's entry, if it is complete.
    ///
    /// # Errors
    ///
    /// [`AclError::NoAccess`] if there is no entry, [`AclError::Incomplete`]
    /// if the entry is pending.
    pub fn complete_entry(&self, grantee: UserId) -> Result<&AclEntry, AclError> {
        match self.get(grantee) {
            None => Err(AclError::NoAccess(grantee)),
            Some(entry) if !entry.is_complete() => Err(AclError::Incomplete(grantee)),
            Some(entry) => Ok(entry),
        }
    }

    /// Insert `entry`, replacing any existing entry for the same grantee in
    /// place. Returns the replaced entry.
    pub fn upsert(&mut self, entry: AclEntry) -> Option<AclEntry> {
        match self
            .0
            .iter_mut()
            .find(|e| e.grantee_user_id == entry.grantee_user_id)
        {
            Some(existing) => Some(std::mem::replace(existing, entry)),
            None => {
                self.0.push(entry);
                None
            }
        }
    }

    /// Remove the grantee's entry. Returns `None` if there was none.
    pub fn remove(&mut self, grantee: UserId) -> Option<AclEntry> {
        let idx = self.0.iter().position(|e| e.grantee_user_id == grantee)?;
        Some(self.0.remove(idx))
    }

    pub fn grantees(&self) -> Vec<UserId> {
        self.0.iter().map(|e| e.grantee_user_id).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AclEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn get_mut(&mut self, grantee: UserId) -> Option<&mut AclEntry> {
        self.0.iter_mut().find(|e| e.grantee_user_id == grantee)
    }
}

impl<'a> IntoIterator for &'a Acl {
    type Item = &'a AclEntry;
    type IntoIter = std::slice::Iter<'a, AclEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
