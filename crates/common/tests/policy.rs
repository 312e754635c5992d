mod common;

use std::collections::BTreeMap;

use ::common::prelude::*;
use crate::common::{add_user, setup_vault};

#[tokio::test]
async fn test_users_cannot_share_or_revoke() {
    let (vault, root) = setup_vault().await;
    let user = add_user(&vault, &root, "user@example.com", Role::User, "ops").await;
    let other = add_user(&vault, &root, "other@example.com", Role::User, "ops").await;

    let record = vault
        .create_secret(&root, "db", BTreeMap::new(), b"x", vec![])
        .await
        .unwrap();
    let id = *record.id();
    vault.share_secret(&root, id, &[user.user_id]).await.unwrap();

    // Holding a complete entry does not let a user share
    let result = vault.share_secret(&user, id, &[other.user_id]).await;
    assert!(matches!(
        result,
        Err(VaultError::PermissionDenied(PermissionDenied {
            role: Role::User,
            operation: Operation::ShareSecret
        }))
    ));
    assert!(matches!(
        vault.revoke_access(&user, id, root.user_id).await,
        Err(VaultError::PermissionDenied(_))
    ));
    assert!(matches!(
        vault.list_users(&user).await,
        Err(VaultError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn test_admins_cannot_mutate_secrets_or_users() {
    let (vault, root) = setup_vault().await;
    let admin = add_user(&vault, &root, "admin@example.com", Role::Admin, "ops").await;

    assert!(matches!(
        vault
            .create_secret(&admin, "db", BTreeMap::new(), b"x", vec![])
            .await,
        Err(VaultError::PermissionDenied(_))
    ));

    let record = vault
        .create_secret(&root, "db", BTreeMap::new(), b"x", vec!["ops".into()])
        .await
        .unwrap();
    let id = *record.id();
    assert!(matches!(
        vault.update_secret(&admin, id, b"y").await,
        Err(VaultError::PermissionDenied(_))
    ));
    assert!(matches!(
        vault.delete_secret(&admin, id).await,
        Err(VaultError::PermissionDenied(_))
    ));
    assert!(matches!(
        vault
            .register_user(
                &admin,
                "new@example.com",
                Role::User,
                "ops",
                "pw",
                KdfParams::for_tests()
            )
            .await,
        Err(VaultError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn test_user_listing_is_scoped() {
    let (vault, root) = setup_vault().await;
    let admin = add_user(&vault, &root, "admin@example.com", Role::Admin, "ops").await;
    let ops_user = add_user(&vault, &root, "u1@example.com", Role::User, "ops").await;
    add_user(&vault, &root, "u2@example.com", Role::User, "dev").await;
    add_user(&vault, &root, "a2@example.com", Role::Admin, "ops").await;

    assert_eq!(vault.list_users(&root).await.unwrap().len(), 5);

    let mut seen: Vec<_> = vault
        .list_users(&admin)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    seen.sort();
    assert_eq!(seen, vec![admin.user_id, ops_user.user_id]);
}

#[tokio::test]
async fn test_secret_visibility() {
    let (vault, root) = setup_vault().await;
    let ops_admin = add_user(&vault, &root, "admin@example.com", Role::Admin, "ops").await;
    let dev_admin = add_user(&vault, &root, "dev@example.com", Role::Admin, "dev").await;
    let user = add_user(&vault, &root, "user@example.com", Role::User, "ops").await;

    vault
        .create_secret(&root, "ops db", BTreeMap::new(), b"x", vec!["ops".into()])
        .await
        .unwrap();
    let shared = vault
        .create_secret(&root, "shared", BTreeMap::new(), b"y", vec![])
        .await
        .unwrap();
    vault
        .share_secret(&root, *shared.id(), &[dev_admin.user_id, user.user_id])
        .await
        .unwrap();

    let titles = |records: Vec<SecretRecord>| -> Vec<String> {
        records.iter().map(|r| r.title().to_string()).collect()
    };
    assert_eq!(
        titles(vault.list_secrets(&root).await.unwrap()),
        vec!["ops db", "shared"]
    );
    assert_eq!(
        titles(vault.list_secrets(&ops_admin).await.unwrap()),
        vec!["ops db"]
    );
    assert_eq!(
        titles(vault.list_secrets(&dev_admin).await.unwrap()),
        vec!["shared"]
    );
    assert_eq!(
        titles(vault.list_secrets(&user).await.unwrap()),
        vec!["shared"]
    );
}
