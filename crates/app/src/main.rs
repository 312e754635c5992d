mod args;
mod op;
mod ops;
mod state;
mod store;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Init, Login, Logout, Secret, User, Version, Whoami};
use state::{AppConfig, AppState};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

command_enum! {
    (Init, Init),
    (Login, Login),
    (Logout, Logout),
    (Whoami, Whoami),
    (User, User),
    (Secret, Secret),
    (Version, Version),
}

/// Initialize logging to stderr, plus a daily rolling file if configured.
/// Returns guards that must be kept alive until the program exits.
fn init_logging(config: &AppConfig) -> Vec<tracing_appender::non_blocking::WorkerGuard> {
    let mut guards = Vec::new();
    let level = config.log_level();

    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(stderr_guard);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stderr_writer)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        );

    let file_layer = config.log_dir.as_ref().and_then(|log_dir| {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!("Warning: Failed to create log directory {:?}: {}", log_dir, e);
            return None;
        }
        let file_appender = tracing_appender::rolling::daily(log_dir, "tvault.log");
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        guards.push(file_guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(level.into())
                        .from_env_lossy(),
                ),
        )
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    let info = common::version::build_info();
    tracing::debug!(version = info.pkg_version, "tvault starting");

    guards
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Before init there is no config yet
    let config = AppState::load(args.config_path.clone())
        .map(|state| state.config)
        .unwrap_or_default();
    let guards = init_logging(&config);

    let ctx = op::OpContext::new(args.config_path);
    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            tracing::debug!("command failed: {e:?}");
            eprintln!("Error: {:#}", anyhow::Error::from(e));
            1
        }
    };

    drop(guards);
    std::process::exit(code);
}
