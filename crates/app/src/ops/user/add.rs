use clap::Args;

use common::prelude::Role;

use crate::op::SessionOpError;

/// Register a new user (super admin only)
#[derive(Args, Debug, Clone)]
pub struct Add {
    #[arg(long)]
    pub email: String,

    /// user, admin or super_admin
    #[arg(long, default_value = "user")]
    pub role: Role,

    #[arg(long)]
    pub team: String,

    /// Initial password for the new user
    #[arg(long, env = "TVAULT_NEW_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[async_trait::async_trait]
impl crate::op::Op for Add {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, vault, session) = ctx.session().await?;
        let user = vault
            .register_user(
                &session,
                &self.email,
                self.role,
                &self.team,
                &self.password,
                state.config.kdf,
            )
            .await?;
        Ok(format!(
            "Registered {} (id: {}, role: {}, team: {})",
            user.email, user.id, user.role, user.team
        ))
    }
}
