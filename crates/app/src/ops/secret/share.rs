use clap::Args;
use uuid::Uuid;

use common::prelude::UserId;

use super::join_ids;
use crate::op::SessionOpError;

/// Wrap a secret's key for other users
#[derive(Args, Debug, Clone)]
pub struct Share {
    pub id: Uuid,

    #[arg(long = "user", required = true)]
    pub users: Vec<UserId>,
}

#[async_trait::async_trait]
impl crate::op::Op for Share {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, session) = ctx.session().await?;
        let record = vault.share_secret(&session, self.id, &self.users).await?;
        Ok(format!(
            "Shared {} with users {} ({} grantees)",
            record.title(),
            join_ids(&self.users),
            record.acl().len()
        ))
    }
}
