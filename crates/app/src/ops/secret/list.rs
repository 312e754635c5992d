use clap::Args;

use common::prelude::ItemStatus;

use crate::op::SessionOpError;

/// List the secrets visible to you
#[derive(Args, Debug, Clone)]
pub struct List {
    /// Decrypt every secret you hold a key for
    #[arg(long)]
    pub reveal: bool,
}

#[async_trait::async_trait]
impl crate::op::Op for List {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, session) = ctx.session().await?;

        let lines: Vec<String> = if self.reveal {
            vault
                .read_all(&session)
                .await?
                .into_iter()
                .map(|item| {
                    let value = match item.status {
                        ItemStatus::Revealed(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                        ItemStatus::AccessPending => "<access pending>".to_string(),
                        ItemStatus::Failed(e) => format!("<error: {e}>"),
                    };
                    format!("{} {}: {}", item.id, item.title, value)
                })
                .collect()
        } else {
            vault
                .list_secrets(&session)
                .await?
                .iter()
                .map(|r| {
                    let access = match r.acl().get(session.user_id) {
                        Some(entry) if entry.is_complete() => "granted",
                        Some(_) => "pending",
                        None => "none",
                    };
                    format!(
                        "{} {} (key version: {} | access: {} | grantees: {})",
                        r.id(),
                        r.title(),
                        r.key_version(),
                        access,
                        r.acl().len()
                    )
                })
                .collect()
        };

        if lines.is_empty() {
            Ok("No secrets found".to_string())
        } else {
            Ok(lines.join("\n"))
        }
    }
}
