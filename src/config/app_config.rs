use serde::Deserialize;
use std::{collections::HashMap, path::PathBuf};

use crate::errors::ConfigError;
use crate::logging::{LogFormat, LoggingConfig};

use super::{
    loader::ConfigLoader,
    server_config::{PartialServerConfig, ServerConfig},
    storage_config::{
        CacheConfig, DatabaseConfig, NotificationConfig, PartialCacheConfig,
        PartialDatabaseConfig, PartialNotificationConfig,
    },
};

// Configuration location constants
pub const USER_CONFIG_PATH: &str = "~/.config/schoolspace";

// Configuration file names
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration written on first run
pub const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../../assets/config.example.toml");

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main Application Configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub notifications: NotificationConfig,
    pub logging: LogSettings,
}

/// Logging section
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialLogSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

/// Partial Application Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialAppConfig {
    server: Option<PartialServerConfig>,
    database: Option<PartialDatabaseConfig>,
    cache: Option<PartialCacheConfig>,
    notifications: Option<PartialNotificationConfig>,
    logging: Option<PartialLogSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_partial_and_env(None, HashMap::new())
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LogSettings {
    fn from_env_or_file(
        partial: Option<PartialLogSettings>,
        env_map: &HashMap<String, String>,
    ) -> Self {
        let partial = partial.unwrap_or_default();
        let defaults = Self::default();

        Self {
            level: env_map
                .get("SCHOOLSPACE_LOG_LEVEL")
                .cloned()
                .or(partial.level)
                .unwrap_or(defaults.level)
                .to_lowercase(),
            format: env_map
                .get("SCHOOLSPACE_LOG_FORMAT")
                .cloned()
                .or(partial.format)
                .unwrap_or(defaults.format)
                .to_lowercase(),
        }
    }

    /// Logging setup derived from this section
    pub fn to_logging_config(&self) -> Result<LoggingConfig, ConfigError> {
        let level = self
            .level
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("unknown level '{}'", self.level),
            })?;
        let format: LogFormat = self.format.parse()?;

        let base = match format {
            LogFormat::Json => LoggingConfig::production(),
            LogFormat::Pretty | LogFormat::Compact => LoggingConfig::development(),
        };
        Ok(LoggingConfig {
            level,
            format,
            ..base
        })
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let loader = ConfigLoader::new();
        loader.load_config()
    }

    /// Load configuration with custom base path (for testing)
    pub fn load_with_base_path(base_path: PathBuf) -> Result<Self, ConfigError> {
        let loader = ConfigLoader::with_base_path(base_path);
        loader.load_config()
    }

    /// Load configuration from an explicit file (the `--config` flag)
    pub fn load_from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let loader = ConfigLoader::with_config_file(path);
        loader.load_config()
    }

    /// Create AppConfig from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialAppConfig>,
        env_map: HashMap<String, String>,
    ) -> Self {
        let partial = partial.unwrap_or_default();

        AppConfig {
            server: ServerConfig::from_env_or_file(partial.server, &env_map),
            database: DatabaseConfig::from_env_or_file(partial.database, &env_map),
            cache: CacheConfig::from_env_or_file(partial.cache, &env_map),
            notifications: NotificationConfig::from_env_or_file(partial.notifications, &env_map),
            logging: LogSettings::from_env_or_file(partial.logging, &env_map),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::FieldMissing("database.url".to_string()));
        }
        if !self.database.url.contains("://") {
            return Err(ConfigError::InvalidValue {
                field: "database.url".to_string(),
                reason: format!("'{}' has no scheme", self.database.url),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!(
                    "unknown level '{}', expected one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        self.logging.format.parse::<LogFormat>()?;

        Ok(())
    }
}
