use clap::Args;
use uuid::Uuid;

use crate::op::SessionOpError;

/// Delete a secret
#[derive(Args, Debug, Clone)]
pub struct Rm {
    pub id: Uuid,
}

#[async_trait::async_trait]
impl crate::op::Op for Rm {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, session) = ctx.session().await?;
        vault.delete_secret(&session, self.id).await?;
        Ok(format!("Deleted secret {}", self.id))
    }
}
