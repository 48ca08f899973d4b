pub mod config;
pub mod domain;
pub mod errors;
pub mod infrastructure;
pub mod logging;
pub mod server;

// Re-export commonly used items for convenience
pub use config::AppConfig;
pub use errors::{AppError, DomainError};
pub use infrastructure::container::{
    ContainerError, Registry, Resolver, Scope, ServiceContainer, ServiceDescriptor, ServiceLifetime,
};
pub use infrastructure::provider::{build_container, ProviderFactory};
