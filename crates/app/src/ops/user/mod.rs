use clap::{Args, Subcommand};

pub mod add;
pub mod list;

use crate::op::Op;

crate::command_enum! {
    (Add, add::Add),
    (Ls, list::List),
}

pub type UserCommand = Command;

/// Manage vault users
#[derive(Args, Debug, Clone)]
pub struct User {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[async_trait::async_trait]
impl Op for User {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
