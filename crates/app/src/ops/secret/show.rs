use std::fmt::Write;

use clap::Args;
use uuid::Uuid;

use common::prelude::ReadOutcome;

use crate::op::SessionOpError;

/// Decrypt and print one secret
#[derive(Args, Debug, Clone)]
pub struct Show {
    pub id: Uuid,
}

#[async_trait::async_trait]
impl crate::op::Op for Show {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, session) = ctx.session().await?;
        let record = vault.get_secret(&session, self.id).await?;
        let value = match vault.read_secret(&session, &record).await? {
            ReadOutcome::Plaintext(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            ReadOutcome::AccessPending => "<access pending>".to_string(),
            ReadOutcome::NoAccess => "<no access>".to_string(),
        };

        let mut out = format!("{} (id: {})\n", record.title(), record.id());
        for (key, val) in record.meta() {
            let _ = writeln!(out, "- {key}: {val}");
        }
        let _ = writeln!(out, "- value: {value}");
        let _ = writeln!(out, "- key version: {}", record.key_version());
        if !record.assigned_to_team_ids().is_empty() {
            let _ = writeln!(out, "- teams: {}", record.assigned_to_team_ids().join(", "));
        }
        let _ = write!(out, "- access:");
        for entry in record.acl() {
            let state = if entry.is_complete() { "granted" } else { "pending" };
            let _ = write!(
                out,
                "\n    user {} {} (v{}, by {} at {})",
                entry.grantee(),
                state,
                entry.key_version(),
                entry.granted_by(),
                entry.granted_at().format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        Ok(out)
    }
}
