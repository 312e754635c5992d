use clap::Args;

use crate::op::AppVaultError;
use crate::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Logout;

#[derive(Debug, thiserror::Error)]
pub enum LogoutError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("logout failed: {0}")]
    Vault(#[from] AppVaultError),
}

#[async_trait::async_trait]
impl crate::op::Op for Logout {
    type Error = LogoutError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, store) = ctx.open()?;
        vault.logout(&store).await?;
        Ok("Logged out".to_string())
    }
}
