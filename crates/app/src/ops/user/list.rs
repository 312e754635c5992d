use clap::Args;

use crate::op::SessionOpError;

/// List the users visible to you
#[derive(Args, Debug, Clone)]
pub struct List;

#[async_trait::async_trait]
impl crate::op::Op for List {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, session) = ctx.session().await?;
        let users = vault.list_users(&session).await?;

        if users.is_empty() {
            return Ok("No users found".to_string());
        }
        Ok(users
            .iter()
            .map(|u| format!("{} {} (role: {} | team: {})", u.id, u.email, u.role, u.team))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
