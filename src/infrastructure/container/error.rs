//! 容器错误类型

use std::fmt;

use uuid::Uuid;

use super::ServiceLifetime;

/// 依赖注入容器错误
#[derive(Debug)]
pub enum ContainerError {
    /// A required service has no registration.
    MissingDependency {
        service: String,
        requested_by: Option<String>,
        available_services: Vec<String>,
        suggestion: Option<String>,
    },
    /// 循环依赖检测 - 包含完整的依赖链
    CircularDependency { chain: Vec<String> },
    /// The same service was registered twice.
    DuplicateRegistration { service: String },
    /// A registration is internally inconsistent (for example a scoped connector).
    InvalidRegistration { service: String, reason: String },
    /// 服务创建失败 - 包含服务信息和底层错误
    ServiceCreationFailed {
        service_type: String,
        reason: String,
        source_error: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// 类型转换失败
    TypeCastFailed {
        expected_type: String,
        context: String,
    },
    /// The service exists but not with the lifetime the caller asked for.
    LifetimeMismatch {
        service: String,
        expected: ServiceLifetime,
        actual: ServiceLifetime,
    },
    /// An external resource could not be reached during `initialize()`.
    ConnectionFailed { resource: String, reason: String },
    /// 作用域错误
    ScopeError {
        scope_id: Uuid,
        scope_name: String,
        operation: String,
        reason: String,
    },
}

impl ContainerError {
    /// Wraps an arbitrary factory failure for `service_type`.
    pub fn creation_failed<E>(service_type: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ContainerError::ServiceCreationFailed {
            service_type: service_type.into(),
            reason: error.to_string(),
            source_error: Some(Box::new(error)),
        }
    }

    /// Returns true for errors caused by how services were registered rather
    /// than by anything that happened at runtime.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ContainerError::MissingDependency { .. }
                | ContainerError::CircularDependency { .. }
                | ContainerError::DuplicateRegistration { .. }
                | ContainerError::InvalidRegistration { .. }
                | ContainerError::LifetimeMismatch { .. }
        )
    }
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::MissingDependency {
                service,
                requested_by,
                available_services,
                suggestion,
            } => {
                write!(f, "Missing dependency '{}'", service)?;
                if let Some(parent) = requested_by {
                    write!(f, " (requested by '{}')", parent)?;
                }
                if !available_services.is_empty() {
                    write!(f, ". Registered services: {}", available_services.join(", "))?;
                }
                if let Some(suggestion) = suggestion {
                    write!(f, ". Did you mean: {}?", suggestion)?;
                }
                Ok(())
            }
            ContainerError::CircularDependency { chain } => {
                write!(f, "Circular dependency detected: {}", chain.join(" -> "))
            }
            ContainerError::DuplicateRegistration { service } => {
                write!(f, "Service '{}' is registered more than once", service)
            }
            ContainerError::InvalidRegistration { service, reason } => {
                write!(f, "Invalid registration for '{}': {}", service, reason)
            }
            ContainerError::ServiceCreationFailed {
                service_type,
                reason,
                ..
            } => {
                write!(f, "Failed to create service '{}': {}", service_type, reason)
            }
            ContainerError::TypeCastFailed {
                expected_type,
                context,
            } => {
                write!(f, "Type cast failed: expected '{}' in {}", expected_type, context)
            }
            ContainerError::LifetimeMismatch {
                service,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Service '{}' is registered as {} but was requested as {}",
                    service, actual, expected
                )
            }
            ContainerError::ConnectionFailed { resource, reason } => {
                write!(f, "Failed to connect to {}: {}", resource, reason)
            }
            ContainerError::ScopeError {
                scope_id,
                scope_name,
                operation,
                reason,
            } => {
                write!(
                    f,
                    "Scope '{}' ({}) error during '{}': {}",
                    scope_name, scope_id, operation, reason
                )
            }
        }
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContainerError::ServiceCreationFailed {
                source_error: Some(source),
                ..
            } => Some(source.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}
