mod common;

use std::collections::BTreeMap;

use ::common::prelude::*;
use crate::common::{add_user, setup_vault, unwrap_dek};

#[tokio::test]
async fn test_revoke_removes_exactly_one_entry() {
    let (vault, root) = setup_vault().await;
    let alice = add_user(&vault, &root, "alice@example.com", Role::User, "ops").await;
    let bob = add_user(&vault, &root, "bob@example.com", Role::User, "ops").await;
    let carol = add_user(&vault, &root, "carol@example.com", Role::User, "ops").await;

    let record = vault
        .create_secret(&root, "db", BTreeMap::new(), b"hunter2", vec![])
        .await
        .unwrap();
    let id = *record.id();
    let before = vault
        .share_secret(&root, id, &[alice.user_id, bob.user_id, carol.user_id])
        .await
        .unwrap();

    let after = vault.revoke_access(&root, id, bob.user_id).await.unwrap();
    assert_eq!(
        after.acl().grantees(),
        vec![root.user_id, alice.user_id, carol.user_id]
    );
    for uid in [root.user_id, alice.user_id, carol.user_id] {
        assert_eq!(after.acl().get(uid), before.acl().get(uid));
    }
    assert_eq!(after.ciphertext(), before.ciphertext());
    assert_eq!(after.key_version(), before.key_version());
    assert_eq!(vault.provider().get_secret(id).await.unwrap(), after);

    // Revoking again is a no-op
    let again = vault.revoke_access(&root, id, bob.user_id).await.unwrap();
    assert_eq!(again, after);
}

#[tokio::test]
async fn test_revocation_without_rotation() {
    let (vault, root) = setup_vault().await;
    let bob = add_user(&vault, &root, "bob@example.com", Role::User, "ops").await;

    let record = vault
        .create_secret(&root, "db", BTreeMap::new(), b"hunter2", vec![])
        .await
        .unwrap();
    let id = *record.id();
    let record = vault.share_secret(&root, id, &[bob.user_id]).await.unwrap();
    let cached_dek = unwrap_dek(&record, &bob);

    vault.revoke_access(&root, id, bob.user_id).await.unwrap();
    let revoked = vault.provider().get_secret(id).await.unwrap();
    assert_eq!(
        vault.read_secret(&bob, &revoked).await.unwrap(),
        ReadOutcome::NoAccess
    );
    // The DEK was not rotated, so a cached copy still opens the body
    assert_eq!(cached_dek.open(revoked.ciphertext()).unwrap(), b"hunter2");

    // Rewriting the body rotates the DEK
    let updated = vault.update_secret(&root, id, b"n3w-p@ss").await.unwrap();
    assert_eq!(updated.key_version(), 2);
    assert_eq!(
        cached_dek.open(updated.ciphertext()),
        Err(CryptoError::DecryptionFailed)
    );
    let outcome = vault.read_secret(&root, &updated).await.unwrap();
    assert_eq!(outcome.plaintext(), Some(b"n3w-p@ss".as_slice()));
}

#[tokio::test]
async fn test_update_rewraps_complete_entries_only() {
    let (vault, root) = setup_vault().await;
    let alice = add_user(&vault, &root, "alice@example.com", Role::User, "ops").await;
    let bob = add_user(&vault, &root, "bob@example.com", Role::User, "ops").await;

    let record = vault
        .create_secret(&root, "db", BTreeMap::new(), b"v1", vec![])
        .await
        .unwrap();
    let id = *record.id();
    vault.share_secret(&root, id, &[alice.user_id]).await.unwrap();
    let before = vault.grant_pending(&root, id, &[bob.user_id]).await.unwrap();

    let updated = vault.update_secret(&root, id, b"v2").await.unwrap();
    assert_eq!(updated.acl().grantees(), before.acl().grantees());

    let alice_entry = updated.acl().get(alice.user_id).unwrap();
    assert!(alice_entry.is_complete());
    assert_eq!(alice_entry.key_version(), 2);
    assert_ne!(
        alice_entry.enc_dek(),
        before.acl().get(alice.user_id).unwrap().enc_dek()
    );
    assert_eq!(
        updated.acl().get(bob.user_id),
        before.acl().get(bob.user_id)
    );

    let outcome = vault.read_secret(&alice, &updated).await.unwrap();
    assert_eq!(outcome.plaintext(), Some(b"v2".as_slice()));
    assert_eq!(
        vault.read_secret(&bob, &updated).await.unwrap(),
        ReadOutcome::AccessPending
    );
}

#[tokio::test]
async fn test_delete_secret() {
    let (vault, root) = setup_vault().await;
    let record = vault
        .create_secret(&root, "db", BTreeMap::new(), b"v1", vec![])
        .await
        .unwrap();
    let id = *record.id();

    vault.delete_secret(&root, id).await.unwrap();
    assert!(matches!(
        vault.provider().get_secret(id).await,
        Err(ProviderError::SecretNotFound(_))
    ));
    assert!(vault.delete_secret(&root, id).await.is_err());
}
