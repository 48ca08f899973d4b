use thiserror::Error;

use crate::infrastructure::cache::StoreError;
use crate::infrastructure::container::ContainerError;
use crate::infrastructure::database::DatabaseError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
    #[error("{0}")]
    Domain(#[from] DomainError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("I/O error while {0}: {1}")]
    IO(String, #[source] std::io::Error), // For generic I/O errors not covered by specific types
    #[error("Application error: {0}")]
    Generic(String), // For simple string-based errors
}

impl AppError {
    /// HTTP status code the error maps to when it reaches a handler boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) => 404,
            AppError::Domain(DomainError::Validation(_)) => 400,
            AppError::Domain(DomainError::Conflict(_)) => 409,
            _ => 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to write to path '{0}': {1}")]
    FileWrite(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Required configuration field '{0}' is missing or invalid")]
    FieldMissing(String),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("Other Config Error: {0}")]
    Other(String),
}

/// Business-rule failures raised by the course and enrollment services.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
