use std::{collections::HashMap, env, fs, path::{Path, PathBuf}};
use crate::errors::ConfigError;

use super::app_config::{
    AppConfig, PartialAppConfig, CONFIG_FILE_NAME, DEFAULT_CONFIG_TEMPLATE, USER_CONFIG_PATH,
};

/// Environment variables consulted on top of the config file
pub const ENV_KEYS: [&str; 6] = [
    "SCHOOLSPACE_LISTEN_ADDR",
    "SCHOOLSPACE_DATABASE_URL",
    "SCHOOLSPACE_CACHE_TTL_SECS",
    "SCHOOLSPACE_NOTIFICATIONS_ENABLED",
    "SCHOOLSPACE_LOG_LEVEL",
    "SCHOOLSPACE_LOG_FORMAT",
];

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default paths
    pub fn new() -> Self {
        Self {
            base_path: None,
            config_file: None,
        }
    }

    /// Create a config loader with custom base path (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
            config_file: None,
        }
    }

    /// Create a config loader reading an explicit file; the file must exist
    pub fn with_config_file(config_file: PathBuf) -> Self {
        Self {
            base_path: None,
            config_file: Some(config_file),
        }
    }

    /// Load complete application configuration
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let config_path = match &self.config_file {
            Some(path) => {
                let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
                if !expanded.exists() {
                    return Err(ConfigError::FileRead(
                        expanded.to_string_lossy().to_string(),
                        std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
                    ));
                }
                expanded
            }
            None => self.initialize_config()?,
        };

        // Load partial config from file
        let partial_config = self.load_partial_config(&config_path)?;

        // Collect environment variables
        let env_map = self.collect_env_vars();

        let config = AppConfig::from_partial_and_env(partial_config, env_map);
        config.validate()?;

        tracing::debug!("已加载配置文件: {:?}", config_path);
        Ok(config)
    }

    /// Write the default config file if it doesn't exist yet
    pub fn initialize_config(&self) -> Result<PathBuf, ConfigError> {
        let config_path = self.extract_file_path(USER_CONFIG_PATH, CONFIG_FILE_NAME);

        if config_path.exists() {
            return Ok(config_path);
        }

        tracing::info!("配置文件 {} 不存在，正在初始化", CONFIG_FILE_NAME);
        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir).map_err(|e| {
                ConfigError::FileWrite(config_dir.to_string_lossy().to_string(), e)
            })?;
        }

        fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE).map_err(|e| {
            ConfigError::FileWrite(config_path.to_string_lossy().to_string(), e)
        })?;

        tracing::info!("已初始化配置文件: {:?}", config_path);
        Ok(config_path)
    }

    /// Extract file path with tilde expansion and base path override
    fn extract_file_path(&self, base_dir: &str, file_name: &str) -> PathBuf {
        let expanded_base = if let Some(base_path) = &self.base_path {
            // For testing: use custom base path
            base_path.join(base_dir.trim_start_matches("~/"))
        } else {
            let expanded = shellexpand::tilde(base_dir);
            PathBuf::from(expanded.as_ref())
        };

        expanded_base.join(file_name)
    }

    /// Load partial configuration from TOML file
    fn load_partial_config(&self, config_path: &Path) -> Result<Option<PartialAppConfig>, ConfigError> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::FileRead(config_path.to_string_lossy().to_string(), e)
        })?;

        let partial_config: PartialAppConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::TomlParse(config_path.to_string_lossy().to_string(), e)
        })?;

        Ok(Some(partial_config))
    }

    /// Collect relevant environment variables
    fn collect_env_vars(&self) -> HashMap<String, String> {
        let mut env_map = HashMap::new();
        for key in &ENV_KEYS {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_loader() -> (ConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_base_path(temp_dir.path().to_path_buf());
        (loader, temp_dir)
    }

    #[test]
    fn test_extract_file_path() {
        let (loader, temp_dir) = create_test_loader();
        let path = loader.extract_file_path("~/.config/schoolspace", "config.toml");
        assert!(path.starts_with(temp_dir.path()));
        assert!(path.ends_with(".config/schoolspace/config.toml"));
    }

    #[test]
    fn test_initialize_writes_default_file_once() {
        let (loader, _temp_dir) = create_test_loader();

        let path = loader.initialize_config().unwrap();
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TEMPLATE);

        // 已存在的文件不会被覆盖
        fs::write(&path, "[server]\nlisten_addr = \"127.0.0.1:4000\"\n").unwrap();
        loader.initialize_config().unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("4000"));
    }

    #[test]
    fn test_load_partial_config_reports_toml_errors() {
        let (loader, temp_dir) = create_test_loader();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[server\nlisten_addr = 1").unwrap();

        let result = loader.load_partial_config(&path);
        assert!(matches!(result, Err(ConfigError::TomlParse(_, _))));
    }

    #[test]
    fn test_missing_explicit_file() {
        let loader = ConfigLoader::with_config_file(PathBuf::from("/definitely/not/here.toml"));
        assert!(matches!(loader.load_config(), Err(ConfigError::FileRead(_, _))));
    }
}
