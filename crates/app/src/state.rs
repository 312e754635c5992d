use std::str::FromStr;
use std::{fs, path::PathBuf};

use common::prelude::KdfParams;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "teamvault";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const VAULT_FILE_NAME: &str = "vault.json";
pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default log level, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Also write logs to a daily rolling file in this directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Password KDF for newly registered identities
    #[serde(default)]
    pub kdf: KdfParams,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
            kdf: KdfParams::default(),
        }
    }
}

impl AppConfig {
    pub fn log_level(&self) -> tracing::Level {
        tracing::Level::from_str(&self.log_level).unwrap_or(tracing::Level::WARN)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the vault directory (~/.teamvault)
    pub vault_dir: PathBuf,
    /// Path to the file-backed server store
    pub vault_path: PathBuf,
    /// Path to the session store
    pub session_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the vault directory path (custom or default ~/.teamvault)
    pub fn vault_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new vault state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let vault_dir = Self::vault_dir(custom_path)?;

        if vault_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&vault_dir)?;

        let config = config.unwrap_or_default();
        let config_path = vault_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // The vault and session files are created on first write
        Ok(Self {
            vault_path: vault_dir.join(VAULT_FILE_NAME),
            session_path: vault_dir.join(SESSION_FILE_NAME),
            vault_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the vault directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let vault_dir = Self::vault_dir(custom_path)?;
        let config_path = vault_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            vault_path: vault_dir.join(VAULT_FILE_NAME),
            session_path: vault_dir.join(SESSION_FILE_NAME),
            vault_dir,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("vault directory not initialized. Run 'tvault init' first")]
    NotInitialized,

    #[error("vault directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault");

        let config = AppConfig {
            log_level: "debug".into(),
            log_dir: None,
            kdf: KdfParams::for_tests(),
        };
        let state = AppState::init(Some(path.clone()), Some(config.clone())).unwrap();
        assert!(state.config_path.exists());
        assert_eq!(state.vault_path, path.join(VAULT_FILE_NAME));

        let loaded = AppState::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.config.log_level(), tracing::Level::DEBUG);

        assert!(matches!(
            AppState::init(Some(path), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            AppState::load(Some(dir.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.log_level(), tracing::Level::WARN);

        let config: AppConfig = toml::from_str(
            r#"
            log_level = "nonsense"

            [kdf]
            algo = "keyed_hash"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level(), tracing::Level::WARN);
        assert!(config.kdf.is_legacy());
    }
}
