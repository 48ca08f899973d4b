//! 服务提供者实现
//!
//! 声明 SchoolSpace 的全部服务：生命周期、依赖与构造方式

use std::sync::Arc;

use super::cache::MemoryStore;
use super::container::{
    ContainerError, Registry, RegistryBuilder, Resolver, ServiceContainer, ServiceDescriptor,
};
use super::database::MemoryDatabase;
use super::notifier::EnrollmentNotifier;
use super::repositories::{CourseRepository, EnrollmentRepository};
use crate::config::AppConfig;
use crate::domain::services::{AuditTrail, CourseService, EnrollmentService, IdGenerator};

/// 服务提供者工厂
pub struct ProviderFactory {
    config: Arc<AppConfig>,
}

impl ProviderFactory {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    /// 注册所有默认服务
    pub fn register_default_providers(&self, builder: RegistryBuilder) -> RegistryBuilder {
        let builder = builder
            // 配置
            .register(ServiceDescriptor::instance(self.config.clone()))
            // 外部资源
            .register(
                ServiceDescriptor::singleton(|resolver: Resolver| async move {
                    let config = resolver.resolve::<AppConfig>().await?;
                    Ok(MemoryDatabase::new(config.database.url.clone()))
                })
                .depends_on::<AppConfig>()
                .connects(),
            )
            .register(
                ServiceDescriptor::singleton(|resolver: Resolver| async move {
                    let config = resolver.resolve::<AppConfig>().await?;
                    Ok(MemoryStore::new(format!(
                        "memory-store (ttl {}s)",
                        config.cache.default_ttl_secs
                    )))
                })
                .depends_on::<AppConfig>()
                .connects(),
            )
            .register(ServiceDescriptor::transient(|_| async { Ok(IdGenerator::new()) }))
            .register(
                ServiceDescriptor::scoped(|resolver: Resolver| async move {
                    let db = resolver.resolve::<MemoryDatabase>().await?;
                    Ok(AuditTrail::new(resolver.scope().id(), db))
                })
                .depends_on::<MemoryDatabase>()
                .disposable(),
            )
            // 仓储
            .register(
                ServiceDescriptor::scoped(|resolver: Resolver| async move {
                    let db = resolver.resolve::<MemoryDatabase>().await?;
                    Ok(CourseRepository::new(db))
                })
                .depends_on::<MemoryDatabase>(),
            )
            .register(
                ServiceDescriptor::scoped(|resolver: Resolver| async move {
                    let db = resolver.resolve::<MemoryDatabase>().await?;
                    Ok(EnrollmentRepository::new(db))
                })
                .depends_on::<MemoryDatabase>(),
            )
            // 领域服务
            .register(
                ServiceDescriptor::scoped(|resolver: Resolver| async move {
                    Ok(CourseService::new(
                        resolver.resolve::<CourseRepository>().await?,
                        resolver.resolve::<MemoryStore>().await?,
                        resolver.resolve::<IdGenerator>().await?,
                        resolver.resolve::<AuditTrail>().await?,
                        resolver.resolve::<AppConfig>().await?,
                    ))
                })
                .depends_on::<CourseRepository>()
                .depends_on::<MemoryStore>()
                .depends_on::<IdGenerator>()
                .depends_on::<AuditTrail>()
                .depends_on::<AppConfig>(),
            )
            .register(
                ServiceDescriptor::scoped(|resolver: Resolver| async move {
                    Ok(EnrollmentService::new(
                        resolver.resolve::<EnrollmentRepository>().await?,
                        resolver.resolve::<CourseRepository>().await?,
                        resolver.resolve::<IdGenerator>().await?,
                        resolver.resolve::<AuditTrail>().await?,
                        resolver.resolve_optional::<EnrollmentNotifier>().await?,
                    ))
                })
                .depends_on::<EnrollmentRepository>()
                .depends_on::<CourseRepository>()
                .depends_on::<IdGenerator>()
                .depends_on::<AuditTrail>()
                .optionally_depends_on::<EnrollmentNotifier>(),
            );

        // 可选服务：仅在启用通知时注册
        if self.config.notifications.enabled {
            let sender = self.config.notifications.sender.clone();
            builder.register(ServiceDescriptor::singleton(move |_| {
                let sender = sender.clone();
                async move { Ok(EnrollmentNotifier::new(sender)) }
            }))
        } else {
            builder
        }
    }

    pub fn build_registry(&self) -> Result<Registry, ContainerError> {
        self.register_default_providers(Registry::builder()).build()
    }

    pub fn build_container(&self) -> Result<ServiceContainer, ContainerError> {
        let registry = self.build_registry()?;
        tracing::info!("📦 已注册 {} 个服务", registry.len());
        Ok(ServiceContainer::new(registry))
    }
}

/// Registry and container for `config` in one call.
pub fn build_container(config: Arc<AppConfig>) -> Result<ServiceContainer, ContainerError> {
    ProviderFactory::new(config).build_container()
}
