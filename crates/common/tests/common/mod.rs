//! Shared fixtures for vault integration tests
#![allow(dead_code)]

use common::prelude::*;

pub const PASSWORD: &str = "correct horse battery staple";

pub type TestVault = Vault<MemoryVaultProvider>;

pub fn tokens(tag: &str) -> TokenPair {
    TokenPair {
        access_token: format!("access-{tag}"),
        refresh_token: format!("refresh-{tag}"),
    }
}

/// Set up an in-memory vault with a bootstrapped super admin on team "ops",
/// returning the vault and the admin's session
pub async fn setup_vault() -> (TestVault, Session) {
    let vault = Vault::new(MemoryVaultProvider::new());
    vault
        .bootstrap("root@example.com", "ops", PASSWORD, KdfParams::for_tests())
        .await
        .unwrap();
    let session = vault
        .login(
            &MemorySessionStore::new(),
            "root@example.com",
            PASSWORD,
            tokens("root"),
        )
        .await
        .unwrap();
    (vault, session)
}

/// Register a user through the super admin and log them in
pub async fn add_user(
    vault: &TestVault,
    root: &Session,
    email: &str,
    role: Role,
    team: &str,
) -> Session {
    vault
        .register_user(root, email, role, team, PASSWORD, KdfParams::for_tests())
        .await
        .unwrap();
    vault
        .login(&MemorySessionStore::new(), email, PASSWORD, tokens(email))
        .await
        .unwrap()
}

/// Unwrap the session user's copy of a record's DEK
pub fn unwrap_dek(record: &SecretRecord, session: &Session) -> Dek {
    record
        .acl()
        .get(session.user_id)
        .expect("no acl entry")
        .share()
        .unwrap()
        .expect("acl entry is pending")
        .recover(session.require_key().unwrap())
        .unwrap()
}
