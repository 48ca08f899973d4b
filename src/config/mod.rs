pub mod app_config;
pub mod loader;
pub mod server_config;
pub mod storage_config;

// Re-export commonly used types
pub use app_config::{AppConfig, LogSettings};
pub use loader::ConfigLoader;
pub use server_config::ServerConfig;
pub use storage_config::{CacheConfig, DatabaseConfig, NotificationConfig};

// Re-export constants
pub use app_config::{CONFIG_FILE_NAME, USER_CONFIG_PATH};
