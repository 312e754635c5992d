use clap::Args;
use uuid::Uuid;

use common::prelude::UserId;

use crate::op::SessionOpError;

/// Remove a user's access to a secret
#[derive(Args, Debug, Clone)]
pub struct Revoke {
    pub id: Uuid,

    #[arg(long)]
    pub user: UserId,
}

#[async_trait::async_trait]
impl crate::op::Op for Revoke {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, session) = ctx.session().await?;
        let record = vault.revoke_access(&session, self.id, self.user).await?;
        Ok(format!(
            "Revoked user {} from {}. Run 'tvault secret update' to rotate its key",
            self.user,
            record.title()
        ))
    }
}
