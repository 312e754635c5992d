use clap::Args;

use common::prelude::VaultProvider;

use crate::op::SessionOpError;

#[derive(Args, Debug, Clone)]
pub struct Whoami;

#[async_trait::async_trait]
impl crate::op::Op for Whoami {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, session) = ctx.session().await?;
        let user = vault
            .provider()
            .get_user(session.user_id)
            .await
            .map_err(common::prelude::VaultError::from)?;

        Ok(format!(
            "{} (id: {})\n\
             - Role: {}\n\
             - Team: {}\n\
             - Public key: {}\n\
             - Password KDF: {}",
            user.email, user.id, user.role, user.team, user.public_key.to_hex(), user.kdf_params
        ))
    }
}
