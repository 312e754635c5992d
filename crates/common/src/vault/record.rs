use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use uuid::Uuid;

use super::acl::Acl;
use crate::crypto::CipherAlgo;

fn first_key_version() -> u32 {
    1
}

/// An encrypted secret as stored server-side.
///
/// `ciphertext` is the body sealed under the record's DEK, laid out as
/// `nonce || ciphertext`. `meta` carries non-secret attributes such as the
/// website and login name, and is stored in the clear.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    id: Uuid,
    title: String,
    #[serde(default)]
    meta: BTreeMap<String, String>,
    #[serde(default)]
    cipher_algo: CipherAlgo,
    #[serde_as(as = "Base64")]
    ciphertext: Vec<u8>,
    #[serde(default)]
    acl: Acl,
    #[serde(default)]
    assigned_to_team_ids: Vec<String>,
    #[serde(default = "first_key_version")]
    key_version: u32,
}

impl SecretRecord {
    pub fn new(
        title: impl Into<String>,
        meta: BTreeMap<String, String>,
        ciphertext: Vec<u8>,
        assigned_to_team_ids: Vec<String>,
        acl: Acl,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            meta,
            cipher_algo: CipherAlgo::XChaCha20Poly1305,
            ciphertext,
            acl,
            assigned_to_team_ids,
            key_version: first_key_version(),
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    pub fn cipher_algo(&self) -> CipherAlgo {
        self.cipher_algo
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn acl(&self) -> &Acl {
        &self.acl
    }

    pub fn acl_mut(&mut self) -> &mut Acl {
        &mut self.acl
    }

    pub fn set_acl(&mut self, acl: Acl) {
        self.acl = acl;
    }

    pub fn assigned_to_team_ids(&self) -> &[String] {
        &self.assigned_to_team_ids
    }

    pub fn key_version(&self) -> u32 {
        self.key_version
    }

    /// Replace the body with one sealed under a new DEK, along with the
    /// re-wrapped ACL, and bump the key version.
    pub(crate) fn rekey(&mut self, ciphertext: Vec<u8>, acl: Acl, key_version: u32) {
        self.ciphertext = ciphertext;
        self.acl = acl;
        self.key_version = key_version;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_meta(&mut self, meta: BTreeMap<String, String>) {
        self.meta = meta;
    }
}
