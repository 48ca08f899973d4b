//! 基础设施层
//!
//! 提供具体的技术实现，包括：
//! - 依赖注入容器
//! - 内存数据库、键值存储与通知发件箱
//! - 仓储
//! - 服务注册

// 容器实现
pub mod container;

pub mod cache;
pub mod database;
pub mod notifier;
pub mod provider;
pub mod repositories;

// 重新导出API
pub use container::{ContainerError, Scope, ServiceContainer, ServiceLifetime};
pub use provider::{build_container, ProviderFactory};
