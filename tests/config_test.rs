//! 配置加载集成测试

use schoolspace::config::app_config::PartialAppConfig;
use schoolspace::config::AppConfig;
use schoolspace::errors::ConfigError;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn config_file(temp_dir: &TempDir) -> std::path::PathBuf {
    temp_dir.path().join(".config/schoolspace/config.toml")
}

#[test]
fn test_first_run_writes_default_config() {
    let temp_dir = TempDir::new().unwrap();

    let config = AppConfig::load_with_base_path(temp_dir.path().to_path_buf()).unwrap();

    assert!(config_file(&temp_dir).exists());
    assert_eq!(config.database.url, "memory://schoolspace");
    assert_eq!(config.cache.default_ttl_secs, 60);
    assert!(!config.notifications.enabled);
}

#[test]
fn test_file_values_override_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = config_file(&temp_dir);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        r#"
[server]
listen_addr = "0.0.0.0:8080"

[cache]
default_ttl_secs = 0

[notifications]
enabled = true
"#,
    )
    .unwrap();

    let config = AppConfig::load_with_base_path(temp_dir.path().to_path_buf()).unwrap();

    assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
    assert_eq!(config.cache.default_ttl_secs, 0);
    assert!(config.notifications.enabled);
    // 未出现的字段保持默认值
    assert_eq!(config.notifications.sender, "no-reply@schoolspace.local");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_explicit_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("custom.toml");
    fs::write(&path, "[logging]\nlevel = \"debug\"\nformat = \"json\"\n").unwrap();

    let config = AppConfig::load_from_file(path).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
}

#[test]
fn test_invalid_values_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    fs::write(&path, "[server]\nlisten_addr = \"not an address\"\n").unwrap();

    let result = AppConfig::load_from_file(path);
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_malformed_toml_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "[database\nurl = ").unwrap();

    let result = AppConfig::load_from_file(path);
    assert!(matches!(result, Err(ConfigError::TomlParse(_, _))));
}

#[test]
fn test_environment_overrides_file() {
    let partial: PartialAppConfig = toml::from_str(
        r#"
[database]
url = "memory://from-file"

[cache]
default_ttl_secs = 30
"#,
    )
    .unwrap();

    let mut env = HashMap::new();
    env.insert("SCHOOLSPACE_DATABASE_URL".to_string(), "memory://from-env".to_string());
    env.insert("SCHOOLSPACE_NOTIFICATIONS_ENABLED".to_string(), "yes".to_string());

    let config = AppConfig::from_partial_and_env(Some(partial), env);

    assert_eq!(config.database.url, "memory://from-env");
    assert_eq!(config.cache.default_ttl_secs, 30);
    assert!(config.notifications.enabled);
    assert!(config.validate().is_ok());
}
