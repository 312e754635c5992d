use clap::Args;
use uuid::Uuid;

use crate::op::SessionOpError;

/// Replace a secret's value under a fresh key
#[derive(Args, Debug, Clone)]
pub struct Update {
    pub id: Uuid,

    #[arg(long, env = "TVAULT_SECRET_VALUE", hide_env_values = true)]
    pub value: String,
}

#[async_trait::async_trait]
impl crate::op::Op for Update {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, session) = ctx.session().await?;
        let record = vault
            .update_secret(&session, self.id, self.value.as_bytes())
            .await?;
        let rewrapped = record.acl().iter().filter(|e| e.is_complete()).count();
        Ok(format!(
            "Updated {} (key version: {}, re-wrapped for {} users)",
            record.title(),
            record.key_version(),
            rewrapped
        ))
    }
}
