//! 依赖注入容器
//!
//! 提供类型安全的服务注册和解析功能，支持：
//! - 单例 / 作用域 / 瞬态三种生命周期
//! - 异步工厂
//! - 循环依赖检测（注册期与解析期）
//! - 作用域结束时的资源释放

pub mod error;
pub mod key;
pub mod lifecycle;
pub mod registry;
pub mod scope;
pub mod service_container;
pub mod stats;

use std::fmt;

pub use error::ContainerError;
pub use key::ServiceKey;
pub use lifecycle::{BoxError, Connector, Dispose};
pub use registry::{Registration, Registry, RegistryBuilder, ServiceDescriptor};
pub use scope::{Resolver, Scope};
pub use service_container::ServiceContainer;
pub use stats::ContainerStats;

/// 服务生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    /// 单例 - 整个应用生命周期只有一个实例
    Singleton,
    /// 作用域 - 在同一个作用域（请求）内共享实例
    Scoped,
    /// 瞬态 - 每次解析都创建新实例
    Transient,
}

impl fmt::Display for ServiceLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceLifetime::Singleton => f.write_str("singleton"),
            ServiceLifetime::Scoped => f.write_str("scoped"),
            ServiceLifetime::Transient => f.write_str("transient"),
        }
    }
}
