use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::errors::ConfigError;

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen_addr: String,
}

/// Partial Server Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialServerConfig {
    pub listen_addr: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables and file config
    pub fn from_env_or_file(
        partial: Option<PartialServerConfig>,
        env_map: &HashMap<String, String>,
    ) -> Self {
        let listen_addr = env_map
            .get("SCHOOLSPACE_LISTEN_ADDR")
            .cloned()
            .or_else(|| partial.and_then(|p| p.listen_addr))
            .unwrap_or_else(default_listen_addr);

        Self { listen_addr }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                field: "server.listen_addr".to_string(),
                reason: format!("'{}': {}", self.listen_addr, e),
            })
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:3030".to_string()
}
