use clap::Args;
use uuid::Uuid;

use common::prelude::UserId;

use super::join_ids;
use crate::op::SessionOpError;

/// Grant access without a key; a holder must share it later
#[derive(Args, Debug, Clone)]
pub struct Grant {
    pub id: Uuid,

    #[arg(long = "user", required = true)]
    pub users: Vec<UserId>,
}

#[async_trait::async_trait]
impl crate::op::Op for Grant {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, session) = ctx.session().await?;
        let record = vault.grant_pending(&session, self.id, &self.users).await?;
        Ok(format!(
            "Granted pending access to {} for users {}",
            record.title(),
            join_ids(&self.users)
        ))
    }
}
