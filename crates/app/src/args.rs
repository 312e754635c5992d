pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tvault")]
#[command(about = "Team credential vault with client-side encryption")]
#[command(version)]
pub struct Args {
    /// Path to the vault state directory (defaults to ~/.teamvault)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
