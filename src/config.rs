use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::sync::ConflictStrategy;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// Sync settings
    pub sync: SyncConfig,
}

/// Sync server and scheduling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the sync server
    pub server_url: Option<String>,
    /// API key for the sync server
    pub api_key: Option<String>,
    /// Conflict resolution strategy, fixed per deployment
    pub strategy: ConflictStrategy,
    /// Seconds between periodic sync passes
    pub sync_interval_secs: u64,
    /// Whether write paths kick off a background sync attempt
    pub auto_sync: bool,
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self {
            database_path: PathBuf::from(&home).join(".logbody").join("logbody.db"),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            api_key: None,
            strategy: ConflictStrategy::default(),
            sync_interval_secs: 300,
            auto_sync: true,
        }
    }
}

impl SyncConfig {
    /// Whether enough is configured to reach a sync server.
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some() && self.api_key.is_some()
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("LOGBODY_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(server_url) = std::env::var("LOGBODY_SERVER_URL") {
            config.sync.server_url = Some(server_url);
        }
        if let Ok(api_key) = std::env::var("LOGBODY_API_KEY") {
            config.sync.api_key = Some(api_key);
        }
        if let Ok(strategy) = std::env::var("LOGBODY_SYNC_STRATEGY") {
            config.sync.strategy = strategy
                .parse()
                .map_err(ConfigError::InvalidStrategy)?;
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/logbody/config.yaml
    pub fn default_config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("logbody")
            .join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidStrategy(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    e
                )
            }
            ConfigError::InvalidStrategy(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
