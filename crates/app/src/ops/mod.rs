pub mod init;
pub mod login;
pub mod logout;
pub mod secret;
pub mod user;
pub mod version;
pub mod whoami;

pub use init::Init;
pub use login::Login;
pub use logout::Logout;
pub use secret::Secret;
pub use user::User;
pub use version::Version;
pub use whoami::Whoami;

#[cfg(test)]
mod tests {
    use common::prelude::{Role, UserId};
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;
    use crate::op::{Op, OpContext};

    const PASSWORD: &str = "pw";

    fn init(email: &str) -> Init {
        Init {
            email: email.to_string(),
            team: "ops".to_string(),
            password: PASSWORD.to_string(),
            legacy_kdf: true,
            log_level: "warn".to_string(),
        }
    }

    fn login(email: &str) -> Login {
        Login {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        }
    }

    fn secret(command: secret::SecretCommand) -> Secret {
        Secret { command }
    }

    fn created_id(output: &str) -> Uuid {
        let id = output
            .rsplit("id: ")
            .next()
            .unwrap()
            .trim_end_matches(')');
        id.parse().unwrap()
    }

    #[tokio::test]
    async fn test_cli_share_flow() {
        let dir = TempDir::new().unwrap();
        let ctx = OpContext::new(Some(dir.path().join("vault")));

        init("root@example.com").execute(&ctx).await.unwrap();
        login("root@example.com").execute(&ctx).await.unwrap();
        let added = user::User {
            command: user::UserCommand::Add(user::add::Add {
                email: "bob@example.com".to_string(),
                role: Role::User,
                team: "ops".to_string(),
                password: PASSWORD.to_string(),
            }),
        }
        .execute(&ctx)
        .await
        .unwrap()
        .to_string();
        assert!(added.contains("id: 2"));

        let created = secret(secret::SecretCommand::Create(secret::create::Create {
            title: "db".to_string(),
            value: "hunter2".to_string(),
            website: Some("db.internal".to_string()),
            login: None,
            meta: vec![],
            teams: vec!["ops".to_string()],
        }))
        .execute(&ctx)
        .await
        .unwrap()
        .to_string();
        let id = created_id(&created);

        secret(secret::SecretCommand::Share(secret::share::Share {
            id,
            users: vec![UserId(2)],
        }))
        .execute(&ctx)
        .await
        .unwrap();

        // Bob reads it from his own session
        login("bob@example.com").execute(&ctx).await.unwrap();
        let shown = secret(secret::SecretCommand::Show(secret::show::Show { id }))
            .execute(&ctx)
            .await
            .unwrap()
            .to_string();
        assert!(shown.contains("- value: hunter2"));
        assert!(shown.contains("- website: db.internal"));

        // A plain user may not rotate or delete
        assert!(
            secret(secret::SecretCommand::Rm(secret::rm::Rm { id }))
                .execute(&ctx)
                .await
                .is_err()
        );

        Logout.execute(&ctx).await.unwrap();
        assert!(Whoami.execute(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_cli_revoke_update_and_pending() {
        let dir = TempDir::new().unwrap();
        let ctx = OpContext::new(Some(dir.path().join("vault")));

        init("root@example.com").execute(&ctx).await.unwrap();
        assert!(init("again@example.com").execute(&ctx).await.is_err());
        login("root@example.com").execute(&ctx).await.unwrap();
        for email in ["bob@example.com", "carol@example.com"] {
            user::User {
                command: user::UserCommand::Add(user::add::Add {
                    email: email.to_string(),
                    role: Role::User,
                    team: "ops".to_string(),
                    password: PASSWORD.to_string(),
                }),
            }
            .execute(&ctx)
            .await
            .unwrap();
        }

        let created = secret(secret::SecretCommand::Create(secret::create::Create {
            title: "api".to_string(),
            value: "v1".to_string(),
            website: None,
            login: None,
            meta: vec![],
            teams: vec![],
        }))
        .execute(&ctx)
        .await
        .unwrap()
        .to_string();
        let id = created_id(&created);

        secret(secret::SecretCommand::Share(secret::share::Share {
            id,
            users: vec![UserId(2)],
        }))
        .execute(&ctx)
        .await
        .unwrap();
        secret(secret::SecretCommand::Grant(secret::grant::Grant {
            id,
            users: vec![UserId(3)],
        }))
        .execute(&ctx)
        .await
        .unwrap();
        secret(secret::SecretCommand::Revoke(secret::revoke::Revoke {
            id,
            user: UserId(2),
        }))
        .execute(&ctx)
        .await
        .unwrap();

        let updated = secret(secret::SecretCommand::Update(secret::update::Update {
            id,
            value: "v2".to_string(),
        }))
        .execute(&ctx)
        .await
        .unwrap()
        .to_string();
        assert!(updated.contains("key version: 2"));
        assert!(updated.contains("re-wrapped for 1 users"));

        // Carol's grant is still pending after the rotation
        login("carol@example.com").execute(&ctx).await.unwrap();
        let listed = secret(secret::SecretCommand::Ls(secret::list::List { reveal: true }))
            .execute(&ctx)
            .await
            .unwrap()
            .to_string();
        assert!(listed.contains("api: <access pending>"));

        // Bob no longer sees it at all
        login("bob@example.com").execute(&ctx).await.unwrap();
        let listed = secret(secret::SecretCommand::Ls(secret::list::List { reveal: false }))
            .execute(&ctx)
            .await
            .unwrap()
            .to_string();
        assert_eq!(listed, "No secrets found");

        login("root@example.com").execute(&ctx).await.unwrap();
        secret(secret::SecretCommand::Rm(secret::rm::Rm { id }))
            .execute(&ctx)
            .await
            .unwrap();
    }
}
