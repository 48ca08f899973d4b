use serde::Deserialize;
use std::collections::HashMap;

/// Database connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Connection URL; only `memory://` is accepted by the bundled database
    pub url: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialDatabaseConfig {
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl DatabaseConfig {
    pub fn from_env_or_file(
        partial: Option<PartialDatabaseConfig>,
        env_map: &HashMap<String, String>,
    ) -> Self {
        let url = env_map
            .get("SCHOOLSPACE_DATABASE_URL")
            .cloned()
            .or_else(|| partial.and_then(|p| p.url))
            .unwrap_or_else(default_database_url);

        Self { url }
    }
}

/// Cache store settings
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// TTL applied to cached course listings; 0 disables caching
    pub default_ttl_secs: u64,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialCacheConfig {
    pub default_ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn from_env_or_file(
        partial: Option<PartialCacheConfig>,
        env_map: &HashMap<String, String>,
    ) -> Self {
        let default_ttl_secs = env_map
            .get("SCHOOLSPACE_CACHE_TTL_SECS")
            .and_then(|s| s.parse().ok())
            .or_else(|| partial.and_then(|p| p.default_ttl_secs))
            .unwrap_or_else(default_cache_ttl_secs);

        Self { default_ttl_secs }
    }
}

/// Enrollment notification settings
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub sender: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialNotificationConfig {
    pub enabled: Option<bool>,
    pub sender: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
            sender: default_sender(),
        }
    }
}

impl NotificationConfig {
    pub fn from_env_or_file(
        partial: Option<PartialNotificationConfig>,
        env_map: &HashMap<String, String>,
    ) -> Self {
        let partial = partial.unwrap_or_default();

        let enabled = env_map
            .get("SCHOOLSPACE_NOTIFICATIONS_ENABLED")
            .and_then(|s| parse_bool(s))
            .or(partial.enabled)
            .unwrap_or_else(default_notifications_enabled);

        Self {
            enabled,
            sender: partial.sender.unwrap_or_else(default_sender),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Default functions
fn default_database_url() -> String {
    "memory://schoolspace".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_notifications_enabled() -> bool {
    false
}

fn default_sender() -> String {
    "no-reply@schoolspace.local".to_string()
}
