use clap::Args;
use uuid::Uuid;

use common::prelude::TokenPair;

use crate::op::AppVaultError;
use crate::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Login {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "TVAULT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("login failed: {0}")]
    Vault(#[from] AppVaultError),
}

/// Opaque tokens for the local store. There is no auth server to refresh
/// against, so a new pair is issued on every login.
fn local_tokens() -> TokenPair {
    TokenPair {
        access_token: Uuid::new_v4().simple().to_string(),
        refresh_token: Uuid::new_v4().simple().to_string(),
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Login {
    type Error = LoginError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, store) = ctx.open()?;
        let session = vault
            .login(&store, &self.email, &self.password, local_tokens())
            .await?;
        Ok(format!(
            "Logged in as {} (id: {}, role: {}, team: {})",
            self.email, session.user_id, session.role, session.team
        ))
    }
}
