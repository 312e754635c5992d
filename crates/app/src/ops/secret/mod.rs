use clap::{Args, Subcommand};

pub mod create;
pub mod grant;
pub mod list;
pub mod revoke;
pub mod rm;
pub mod share;
pub mod show;
pub mod update;

use crate::op::Op;

crate::command_enum! {
    (Create, create::Create),
    (Ls, list::List),
    (Show, show::Show),
    (Share, share::Share),
    (Grant, grant::Grant),
    (Revoke, revoke::Revoke),
    (Update, update::Update),
    (Rm, rm::Rm),
}

pub type SecretCommand = Command;

/// Create, read and share secrets
#[derive(Args, Debug, Clone)]
pub struct Secret {
    #[command(subcommand)]
    pub command: SecretCommand,
}

#[async_trait::async_trait]
impl Op for Secret {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

pub(crate) fn join_ids<T: std::fmt::Display>(ids: &[T]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
