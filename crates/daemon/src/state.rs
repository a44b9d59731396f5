use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "db.sqlite";

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port the HTTP server listens on.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// The on-disk application directory: `config.toml` plus the sqlite
/// database every daemon run persists into.
#[derive(Debug, Clone)]
pub struct AppState {
    pub burrow_dir: PathBuf,
    pub db_path: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Create the config directory and write a fresh `config.toml`.
    pub fn init(config_path: Option<PathBuf>, config: AppConfig) -> Result<Self, StateError> {
        let burrow_dir = Self::dir(config_path)?;
        let config_file = burrow_dir.join(CONFIG_FILE);
        if config_file.exists() {
            return Err(StateError::AlreadyInitialized(burrow_dir));
        }

        std::fs::create_dir_all(&burrow_dir)?;
        std::fs::write(&config_file, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            db_path: burrow_dir.join(DB_FILE),
            burrow_dir,
            config,
        })
    }

    /// Load a previously initialized config directory.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, StateError> {
        let burrow_dir = Self::dir(config_path)?;
        let config_file = burrow_dir.join(CONFIG_FILE);
        let raw = std::fs::read_to_string(&config_file)
            .map_err(|_| StateError::NotInitialized(burrow_dir.clone()))?;
        let config = toml::from_str(&raw)?;

        Ok(Self {
            db_path: burrow_dir.join(DB_FILE),
            burrow_dir,
            config,
        })
    }

    /// Resolve the config directory: explicit path, or `~/.burrow`.
    fn dir(config_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        match config_path {
            Some(path) => Ok(path),
            None => dirs::home_dir()
                .map(|home| home.join(".burrow"))
                .ok_or(StateError::NoHomeDir),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not determine a home directory")]
    NoHomeDir,
    #[error("already initialized: {0:?}")]
    AlreadyInitialized(PathBuf),
    #[error("not initialized (run `burrow init` first): {0:?}")]
    NotInitialized(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    InvalidConfig(#[from] toml::de::Error),
    #[error("could not serialize config: {0}")]
    SerializeConfig(#[from] toml::ser::Error),
}
