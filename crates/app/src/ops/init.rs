use clap::Args;

use common::prelude::{KdfParams, Vault};

use crate::op::AppVaultError;
use crate::state::{AppConfig, AppState, StateError};
use crate::store::FileVaultProvider;

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Login email for the first super admin
    #[arg(long)]
    pub email: String,

    /// Team of the first super admin
    #[arg(long, default_value = "default")]
    pub team: String,

    /// Password protecting the super admin's private key
    #[arg(long, env = "TVAULT_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Use the legacy keyed-hash password KDF instead of Argon2id
    #[arg(long)]
    pub legacy_kdf: bool,

    /// Default log level written to config.toml
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] AppVaultError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let kdf = if self.legacy_kdf {
            KdfParams::legacy()
        } else {
            KdfParams::default()
        };
        let config = AppConfig {
            log_level: self.log_level.clone(),
            kdf,
            ..Default::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let vault = Vault::new(FileVaultProvider::new(&state.vault_path));
        let admin = vault
            .bootstrap(&self.email, &self.team, &self.password, state.config.kdf)
            .await?;

        let output = format!(
            "Initialized vault directory at: {}\n\
             - Config: {}\n\
             - Vault: {}\n\
             - Super admin: {} (id: {}, team: {})\n\
             - Password KDF: {}",
            state.vault_dir.display(),
            state.config_path.display(),
            state.vault_path.display(),
            admin.email,
            admin.id,
            admin.team,
            admin.kdf_params,
        );

        Ok(output)
    }
}
