use std::error::Error;
use std::path::PathBuf;

use common::prelude::{Session, SessionError, SessionStore, Vault, VaultError};

use crate::state::{AppState, StateError};
use crate::store::{FileSessionStore, FileStoreError, FileVaultProvider};

pub type AppVault = Vault<FileVaultProvider>;
pub type AppVaultError = VaultError<FileStoreError>;

#[derive(Debug, Clone)]
pub struct OpContext {
    /// Optional custom config path (defaults to ~/.teamvault)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    pub fn state(&self) -> Result<AppState, StateError> {
        AppState::load(self.config_path.clone())
    }

    /// Load state and open the file-backed vault and session store
    pub fn open(&self) -> Result<(AppState, AppVault, FileSessionStore), StateError> {
        let state = self.state()?;
        let vault = Vault::new(FileVaultProvider::new(&state.vault_path));
        let store = FileSessionStore::new(&state.session_path);
        Ok((state, vault, store))
    }

    /// Like [`OpContext::open`], also loading the current session
    pub async fn session(&self) -> Result<(AppState, AppVault, Session), SessionOpError> {
        let (state, vault, store) = self.open()?;
        let session = store.load().await?;
        Ok((state, vault, session))
    }
}

/// Failures shared by every op that needs a logged-in session
#[derive(Debug, thiserror::Error)]
pub enum SessionOpError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Vault(#[from] AppVaultError),
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
