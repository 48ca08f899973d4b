//! 作用域与解析器
//!
//! 每个请求一个 `Scope`。作用域服务缓存在作用域内，单例委托给容器，
//! 瞬态服务每次解析都重新构造。

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::ContainerError;
use super::key::ServiceKey;
use super::registry::{DisposeFn, Instance, Registration};
use super::service_container::ContainerShared;
use super::stats::StatsCounters;
use super::ServiceLifetime;

/// 需要在作用域结束时释放的实例
struct Tracked {
    key: ServiceKey,
    instance: Instance,
    disposer: DisposeFn,
}

pub(crate) struct ScopeState {
    id: Uuid,
    name: String,
    created_at: Instant,
    bootstrap: bool,
    instances: DashMap<ServiceKey, Arc<OnceCell<Instance>>>,
    disposables: Mutex<Vec<Tracked>>,
    disposed: AtomicBool,
    stats: Arc<StatsCounters>,
}

impl ScopeState {
    pub(crate) fn new(name: String, stats: Arc<StatsCounters>, bootstrap: bool) -> Self {
        if !bootstrap {
            StatsCounters::bump(&stats.scopes_created);
            stats.active_scopes.fetch_add(1, Ordering::Relaxed);
        }

        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Instant::now(),
            bootstrap,
            instances: DashMap::new(),
            disposables: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
            stats,
        }
    }

    fn track(&self, key: ServiceKey, instance: &Instance, disposer: Option<&DisposeFn>) {
        if let Some(disposer) = disposer {
            self.disposables.lock().push(Tracked {
                key,
                instance: instance.clone(),
                disposer: disposer.clone(),
            });
        }
    }
}

impl Drop for ScopeState {
    fn drop(&mut self) {
        if !self.bootstrap {
            self.stats.active_scopes.fetch_sub(1, Ordering::Relaxed);
        }

        let pending = std::mem::take(self.disposables.get_mut());
        if pending.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let stats = self.stats.clone();
                let name = std::mem::take(&mut self.name);
                let id = self.id;
                handle.spawn(async move {
                    let count = dispose_all(pending, &stats).await;
                    debug!(scope = %name, scope_id = %id, disposed = count, "dropped scope disposed in background");
                });
            }
            Err(_) => {
                warn!(
                    scope = %self.name,
                    scope_id = %self.id,
                    pending = pending.len(),
                    "scope dropped outside a tokio runtime, disposers were not run"
                );
            }
        }
    }
}

async fn dispose_all(tracked: Vec<Tracked>, stats: &StatsCounters) -> usize {
    let mut count = 0;
    // 按创建顺序的逆序释放
    for entry in tracked.into_iter().rev() {
        debug!(service = %entry.key, "disposing instance");
        (entry.disposer)(entry.instance).await;
        StatsCounters::bump(&stats.disposed_instances);
        count += 1;
    }
    count
}

/// Per-request resolution context.
///
/// Cloning is cheap and yields a handle to the same scope. The scope should
/// not be shared across requests.
#[derive(Clone)]
pub struct Scope {
    shared: Arc<ContainerShared>,
    state: Arc<ScopeState>,
}

impl Scope {
    pub(crate) fn new(shared: Arc<ContainerShared>, name: String) -> Self {
        let state = Arc::new(ScopeState::new(name, shared.stats.clone(), false));
        Self { shared, state }
    }

    /// Scope owned by the container, used to build singletons and connectors.
    pub(crate) fn bootstrap(shared: &Arc<ContainerShared>) -> Self {
        Self {
            shared: shared.clone(),
            state: shared.bootstrap.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.state.id
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn elapsed(&self) -> Duration {
        self.state.created_at.elapsed()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Acquire)
    }

    /// Number of scoped instances cached in this scope.
    pub fn instance_count(&self) -> usize {
        self.state
            .instances
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    /// Resolver with an empty dependency chain.
    pub fn resolver(&self) -> Resolver {
        Resolver {
            scope: self.clone(),
            chain: Arc::from(Vec::new()),
        }
    }

    /// 解析服务
    pub async fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        self.resolver().resolve::<T>().await
    }

    /// 解析可选服务；未注册时返回 `Ok(None)`
    pub async fn resolve_optional<T: Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, ContainerError> {
        self.resolver().resolve_optional::<T>().await
    }

    /// Ends the scope: runs the disposers of every tracked instance in reverse
    /// creation order and drops the scoped cache. Only the first call does any
    /// work; it returns the number of instances disposed.
    pub async fn dispose(&self) -> usize {
        if self.state.disposed.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let tracked = std::mem::take(&mut *self.state.disposables.lock());
        let count = dispose_all(tracked, &self.state.stats).await;
        self.state.instances.clear();

        debug!(
            scope = %self.state.name,
            scope_id = %self.state.id,
            disposed = count,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "scope ended"
        );
        count
    }

    pub(crate) async fn resolve_key(
        &self,
        key: ServiceKey,
        chain: &[ServiceKey],
    ) -> Result<Instance, ContainerError> {
        StatsCounters::bump(&self.shared.stats.total_resolutions);

        let result = self.resolve_uncounted(key, chain).await;
        if result.is_err() {
            StatsCounters::bump(&self.shared.stats.failed_resolutions);
        }
        result
    }

    async fn resolve_uncounted(
        &self,
        key: ServiceKey,
        chain: &[ServiceKey],
    ) -> Result<Instance, ContainerError> {
        if self.is_disposed() {
            return Err(ContainerError::ScopeError {
                scope_id: self.state.id,
                scope_name: self.state.name.clone(),
                operation: "resolve".to_string(),
                reason: format!("cannot resolve '{}' after the scope was disposed", key),
            });
        }

        // 检查循环依赖
        if let Some(position) = chain.iter().position(|k| *k == key) {
            let mut names: Vec<String> = chain[position..]
                .iter()
                .map(|k| k.short_name().to_string())
                .collect();
            names.push(key.short_name().to_string());
            return Err(ContainerError::CircularDependency { chain: names });
        }

        let registration = self
            .shared
            .registry
            .get(&key)
            .ok_or_else(|| self.shared.registry.missing(&key, chain.last()))?;

        let mut next = chain.to_vec();
        next.push(key);
        let next: Arc<[ServiceKey]> = Arc::from(next);

        match registration.lifetime() {
            ServiceLifetime::Singleton => self.resolve_singleton(registration, next).await,
            ServiceLifetime::Scoped => self.resolve_scoped(registration, next).await,
            ServiceLifetime::Transient => self.resolve_transient(registration, next).await,
        }
    }

    /// 解析单例服务：委托给容器级缓存，工厂在 bootstrap 作用域中运行
    async fn resolve_singleton(
        &self,
        registration: &Registration,
        chain: Arc<[ServiceKey]>,
    ) -> Result<Instance, ContainerError> {
        let key = registration.key();
        let stats = &self.shared.stats;
        let cell = self.shared.singletons.entry(key).or_default().clone();

        if let Some(instance) = cell.get() {
            StatsCounters::bump(&stats.singleton_cache_hits);
            return Ok(instance.clone());
        }

        let resolver = Resolver {
            scope: Scope::bootstrap(&self.shared),
            chain,
        };
        let constructed = AtomicBool::new(false);
        let flag = &constructed;
        let shared = &self.shared;

        let instance = cell
            .get_or_try_init(|| async move {
                flag.store(true, Ordering::Relaxed);
                StatsCounters::bump(&shared.stats.singleton_cache_misses);
                let instance = (registration.factory)(resolver).await?;
                shared.track_singleton(key, &instance);
                debug!(service = %key, "singleton constructed");
                Ok::<_, ContainerError>(instance)
            })
            .await?
            .clone();

        if !constructed.load(Ordering::Relaxed) {
            StatsCounters::bump(&stats.singleton_cache_hits);
        }
        Ok(instance)
    }

    /// 解析作用域服务：同一作用域内只构造一次
    async fn resolve_scoped(
        &self,
        registration: &Registration,
        chain: Arc<[ServiceKey]>,
    ) -> Result<Instance, ContainerError> {
        let key = registration.key();
        let stats = &self.shared.stats;
        let cell = self.state.instances.entry(key).or_default().clone();

        if let Some(instance) = cell.get() {
            StatsCounters::bump(&stats.scoped_cache_hits);
            return Ok(instance.clone());
        }

        let resolver = Resolver {
            scope: self.clone(),
            chain,
        };
        let constructed = AtomicBool::new(false);
        let flag = &constructed;
        let state = &self.state;

        let instance = cell
            .get_or_try_init(|| async move {
                flag.store(true, Ordering::Relaxed);
                let instance = (registration.factory)(resolver).await?;
                StatsCounters::bump(&state.stats.scoped_creations);
                state.track(key, &instance, registration.disposer.as_ref());
                debug!(service = %key, scope = %state.name, "scoped instance constructed");
                Ok::<_, ContainerError>(instance)
            })
            .await?
            .clone();

        if !constructed.load(Ordering::Relaxed) {
            StatsCounters::bump(&stats.scoped_cache_hits);
        }
        Ok(instance)
    }

    /// 解析瞬态服务：每次都重新构造，从不缓存
    async fn resolve_transient(
        &self,
        registration: &Registration,
        chain: Arc<[ServiceKey]>,
    ) -> Result<Instance, ContainerError> {
        let resolver = Resolver {
            scope: self.clone(),
            chain,
        };
        let instance = (registration.factory)(resolver).await?;
        StatsCounters::bump(&self.shared.stats.transient_creations);
        self.state
            .track(registration.key(), &instance, registration.disposer.as_ref());
        Ok(instance)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.state.id)
            .field("name", &self.state.name)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Handle passed to factories.
///
/// Resolves dependencies in the scope that is constructing the current
/// service and carries the chain of services under construction, so that a
/// service requesting itself (directly or through others) fails with
/// `ContainerError::CircularDependency`. A factory may only resolve services
/// declared with `depends_on` or `optionally_depends_on`; anything else fails
/// with `ContainerError::InvalidRegistration`. Factories should not store the
/// resolver inside the instance they build: it keeps the scope alive.
#[derive(Clone)]
pub struct Resolver {
    scope: Scope,
    chain: Arc<[ServiceKey]>,
}

impl Resolver {
    pub async fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let key = ServiceKey::of::<T>();
        self.check_declared(&key)?;
        let instance = self.scope.resolve_key(key, &self.chain).await?;

        instance
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeCastFailed {
                expected_type: key.type_name().to_string(),
                context: format!("resolution in scope '{}'", self.scope.name()),
            })
    }

    pub async fn resolve_optional<T: Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, ContainerError> {
        let key = ServiceKey::of::<T>();
        self.check_declared(&key)?;
        if !self.scope.shared.registry.contains(&key) {
            return Ok(None);
        }
        self.resolve::<T>().await.map(Some)
    }

    // 未声明的依赖边不在构建期环检测范围内，必须拒绝
    fn check_declared(&self, key: &ServiceKey) -> Result<(), ContainerError> {
        let Some(parent) = self.chain.last() else {
            return Ok(());
        };
        match self.scope.shared.registry.get(parent) {
            Some(registration) if !registration.declares(key) => {
                Err(ContainerError::InvalidRegistration {
                    service: parent.type_name().to_string(),
                    reason: format!(
                        "resolved '{}' without declaring it with depends_on",
                        key.short_name()
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Services currently under construction, outermost first.
    pub fn chain(&self) -> &[ServiceKey] {
        &self.chain
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("scope", &self.scope)
            .field("chain", &self.chain)
            .finish()
    }
}
