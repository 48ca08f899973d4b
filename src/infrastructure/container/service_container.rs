//! 服务容器
//!
//! 持有只读注册表、单例缓存和用于构造单例的 bootstrap 作用域。
//! 克隆开销很小，所有克隆共享同一份状态。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::error::ContainerError;
use super::key::ServiceKey;
use super::registry::{ConnectHooks, Instance, Registry};
use super::scope::{Scope, ScopeState};
use super::stats::{ContainerStats, StatsCounters};
use super::ServiceLifetime;

pub(crate) struct ContainerShared {
    pub(crate) registry: Registry,
    /// 单例实例缓存 - 使用OnceCell确保只创建一次
    pub(crate) singletons: DashMap<ServiceKey, Arc<OnceCell<Instance>>>,
    singleton_order: Mutex<Vec<(ServiceKey, Instance)>>,
    connected: Mutex<Vec<(ServiceKey, Instance, ConnectHooks)>>,
    pub(crate) bootstrap: Arc<ScopeState>,
    pub(crate) stats: Arc<StatsCounters>,
    initialized: OnceCell<()>,
    shut_down: AtomicBool,
}

impl ContainerShared {
    pub(crate) fn track_singleton(&self, key: ServiceKey, instance: &Instance) {
        self.singleton_order.lock().push((key, instance.clone()));
    }
}

/// Dependency-injection container.
///
/// Built from a validated [`Registry`]; hand out request scopes with
/// [`ServiceContainer::create_scope`].
#[derive(Clone)]
pub struct ServiceContainer {
    shared: Arc<ContainerShared>,
}

impl ServiceContainer {
    pub fn new(registry: Registry) -> Self {
        let stats = Arc::new(StatsCounters::default());
        let bootstrap = Arc::new(ScopeState::new("bootstrap".to_string(), stats.clone(), true));

        Self {
            shared: Arc::new(ContainerShared {
                registry,
                singletons: DashMap::new(),
                singleton_order: Mutex::new(Vec::new()),
                connected: Mutex::new(Vec::new()),
                bootstrap,
                stats,
                initialized: OnceCell::new(),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    /// Opens every connector registration. Concurrent callers wait for the
    /// single in-flight attempt; after a success further calls return at once.
    /// A failed attempt leaves the container uninitialised.
    pub async fn initialize(&self) -> Result<(), ContainerError> {
        self.shared
            .initialized
            .get_or_try_init(|| self.connect_all())
            .await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.initialized()
    }

    async fn connect_all(&self) -> Result<(), ContainerError> {
        let mut connectors: Vec<_> = self
            .shared
            .registry
            .registrations()
            .filter_map(|registration| {
                registration
                    .connector
                    .clone()
                    .map(|hooks| (registration.key(), hooks))
            })
            .collect();
        connectors.sort_by_key(|(key, _)| key.type_name());

        info!("🔌 正在初始化 {} 个外部连接", connectors.len());

        let bootstrap = Scope::bootstrap(&self.shared);
        let mut opened: Vec<(ServiceKey, Instance, ConnectHooks)> = Vec::new();

        for (key, hooks) in connectors {
            let attempt = async {
                let instance = bootstrap.resolve_key(key, &[]).await?;
                match (hooks.connect)(instance.clone()).await {
                    Ok(resource) => {
                        info!("✅ 已连接: {}", resource);
                        Ok::<Instance, ContainerError>(instance)
                    }
                    Err((resource, e)) => Err(ContainerError::ConnectionFailed {
                        resource,
                        reason: e.to_string(),
                    }),
                }
            };

            match attempt.await {
                Ok(instance) => opened.push((key, instance, hooks)),
                Err(e) => {
                    warn!("❌ 初始化失败: {}", e);
                    for (_, instance, hooks) in opened.into_iter().rev() {
                        (hooks.disconnect)(instance).await;
                    }
                    return Err(e);
                }
            }
        }

        self.shared.connected.lock().extend(opened);
        info!("🚀 容器初始化完成");
        Ok(())
    }

    /// New request scope named `request`.
    pub fn create_scope(&self) -> Scope {
        self.create_named_scope("request")
    }

    pub fn create_named_scope(&self, name: impl Into<String>) -> Scope {
        let scope = Scope::new(self.shared.clone(), name.into());
        debug!(scope = scope.name(), scope_id = %scope.id(), "scope created");
        scope
    }

    /// 解析单例服务（无需请求作用域）
    pub async fn resolve_singleton<T: Send + Sync + 'static>(
        &self,
    ) -> Result<Arc<T>, ContainerError> {
        let key = ServiceKey::of::<T>();
        let registration = self
            .shared
            .registry
            .get(&key)
            .ok_or_else(|| self.shared.registry.missing(&key, None))?;

        if registration.lifetime() != ServiceLifetime::Singleton {
            return Err(ContainerError::LifetimeMismatch {
                service: key.type_name().to_string(),
                expected: ServiceLifetime::Singleton,
                actual: registration.lifetime(),
            });
        }

        Scope::bootstrap(&self.shared).resolve::<T>().await
    }

    /// 检查服务是否已注册
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.shared.registry.contains(&ServiceKey::of::<T>())
    }

    /// 获取容器统计信息
    pub fn stats(&self) -> ContainerStats {
        let active_singletons = self
            .shared
            .singletons
            .iter()
            .filter(|entry| entry.value().initialized())
            .count();
        self.shared
            .stats
            .snapshot(self.shared.registry.len(), active_singletons)
    }

    /// Disposes the bootstrap scope, then disposable singletons in reverse
    /// construction order, then disconnects connectors. Only the first call
    /// does any work.
    pub async fn shutdown(&self) {
        if self.shared.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("🛑 正在关闭服务容器");
        let bootstrap_disposed = Scope::bootstrap(&self.shared).dispose().await;

        let singletons = std::mem::take(&mut *self.shared.singleton_order.lock());
        let mut singletons_disposed = 0;
        for (key, instance) in singletons.into_iter().rev() {
            let disposer = self
                .shared
                .registry
                .get(&key)
                .and_then(|registration| registration.disposer.clone());
            if let Some(disposer) = disposer {
                debug!(service = %key, "disposing singleton");
                disposer(instance).await;
                StatsCounters::bump(&self.shared.stats.disposed_instances);
                singletons_disposed += 1;
            }
        }

        let connected = std::mem::take(&mut *self.shared.connected.lock());
        for (key, instance, hooks) in connected.into_iter().rev() {
            debug!(service = %key, "disconnecting");
            (hooks.disconnect)(instance).await;
        }

        info!(
            "✅ 服务容器已关闭 (bootstrap 释放 {} 个, 单例释放 {} 个)",
            bootstrap_disposed, singletons_disposed
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shut_down.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("registry", &self.shared.registry)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
