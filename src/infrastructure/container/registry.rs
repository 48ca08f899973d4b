//! 服务注册表
//!
//! 启动时一次性构建，构建完成后只读。`RegistryBuilder::build` 会校验：
//! - 重复注册
//! - 声明的依赖未注册
//! - 声明的依赖形成环（可选依赖同样参与）
//! - 非单例的连接器

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::warn;

use super::error::ContainerError;
use super::key::ServiceKey;
use super::lifecycle::{BoxError, Connector, Dispose};
use super::scope::Resolver;
use super::ServiceLifetime;

/// 类型擦除后的服务实例
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type FactoryFn =
    Arc<dyn Fn(Resolver) -> BoxFuture<'static, Result<Instance, ContainerError>> + Send + Sync>;

pub(crate) type DisposeFn = Arc<dyn Fn(Instance) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct ConnectHooks {
    pub(crate) connect: Arc<dyn Fn(Instance) -> BoxFuture<'static, Result<String, (String, BoxError)>> + Send + Sync>,
    pub(crate) disconnect: Arc<dyn Fn(Instance) -> BoxFuture<'static, ()> + Send + Sync>,
}

/// 服务注册信息
#[derive(Clone)]
pub struct Registration {
    key: ServiceKey,
    lifetime: ServiceLifetime,
    dependencies: Vec<ServiceKey>,
    optional_dependencies: Vec<ServiceKey>,
    pub(crate) factory: FactoryFn,
    pub(crate) disposer: Option<DisposeFn>,
    pub(crate) connector: Option<ConnectHooks>,
}

impl Registration {
    pub fn key(&self) -> ServiceKey {
        self.key
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    pub fn dependencies(&self) -> &[ServiceKey] {
        &self.dependencies
    }

    pub fn optional_dependencies(&self) -> &[ServiceKey] {
        &self.optional_dependencies
    }

    /// Whether the factory is allowed to resolve `key`.
    pub fn declares(&self, key: &ServiceKey) -> bool {
        self.dependencies.contains(key) || self.optional_dependencies.contains(key)
    }

    fn declared_edges(&self) -> impl Iterator<Item = &ServiceKey> {
        self.dependencies.iter().chain(self.optional_dependencies.iter())
    }

    pub fn is_disposable(&self) -> bool {
        self.disposer.is_some()
    }

    pub fn is_connector(&self) -> bool {
        self.connector.is_some()
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("dependencies", &self.dependencies)
            .field("optional_dependencies", &self.optional_dependencies)
            .field("disposable", &self.is_disposable())
            .field("connector", &self.is_connector())
            .finish()
    }
}

/// Typed recipe for one service, turned into a [`Registration`] by the builder.
///
/// ```ignore
/// ServiceDescriptor::scoped(|resolver: Resolver| async move {
///     let db = resolver.resolve::<MemoryDatabase>().await?;
///     Ok(CourseRepository::new(db))
/// })
/// .depends_on::<MemoryDatabase>()
/// ```
pub struct ServiceDescriptor<T> {
    registration: Registration,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ServiceDescriptor<T> {
    pub fn new<F, Fut>(lifetime: ServiceLifetime, factory: F) -> Self
    where
        F: Fn(Resolver) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ContainerError>> + Send + 'static,
    {
        let factory: FactoryFn = Arc::new(
            move |resolver: Resolver| -> BoxFuture<'static, Result<Instance, ContainerError>> {
                let pending = factory(resolver);
                Box::pin(async move {
                    let service = pending.await?;
                    Ok(Arc::new(service) as Instance)
                })
            },
        );

        Self {
            registration: Registration {
                key: ServiceKey::of::<T>(),
                lifetime,
                dependencies: Vec::new(),
                optional_dependencies: Vec::new(),
                factory,
                disposer: None,
                connector: None,
            },
            _marker: PhantomData,
        }
    }

    pub fn singleton<F, Fut>(factory: F) -> Self
    where
        F: Fn(Resolver) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ContainerError>> + Send + 'static,
    {
        Self::new(ServiceLifetime::Singleton, factory)
    }

    pub fn scoped<F, Fut>(factory: F) -> Self
    where
        F: Fn(Resolver) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ContainerError>> + Send + 'static,
    {
        Self::new(ServiceLifetime::Scoped, factory)
    }

    pub fn transient<F, Fut>(factory: F) -> Self
    where
        F: Fn(Resolver) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ContainerError>> + Send + 'static,
    {
        Self::new(ServiceLifetime::Transient, factory)
    }

    /// Singleton holding an already built value.
    pub fn instance(value: Arc<T>) -> Self {
        let registration = Registration {
            key: ServiceKey::of::<T>(),
            lifetime: ServiceLifetime::Singleton,
            dependencies: Vec::new(),
            optional_dependencies: Vec::new(),
            factory: Arc::new(
                move |_: Resolver| -> BoxFuture<'static, Result<Instance, ContainerError>> {
                    let value = value.clone() as Instance;
                    Box::pin(async move { Ok(value) })
                },
            ),
            disposer: None,
            connector: None,
        };

        Self {
            registration,
            _marker: PhantomData,
        }
    }

    /// Declares a dependency the factory resolves. Declarations are checked
    /// by `RegistryBuilder::build`, and a factory may only resolve what it
    /// declared.
    pub fn depends_on<D: ?Sized + 'static>(mut self) -> Self {
        let key = ServiceKey::of::<D>();
        if !self.registration.dependencies.contains(&key) {
            self.registration.dependencies.push(key);
        }
        self
    }

    /// Declares a dependency resolved with `resolve_optional`. It may be left
    /// unregistered, but still takes part in cycle detection when present.
    pub fn optionally_depends_on<D: ?Sized + 'static>(mut self) -> Self {
        let key = ServiceKey::of::<D>();
        if !self.registration.optional_dependencies.contains(&key) {
            self.registration.optional_dependencies.push(key);
        }
        self
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.registration.lifetime
    }

    pub fn into_registration(self) -> Registration {
        self.registration
    }
}

impl<T: Dispose> ServiceDescriptor<T> {
    /// Runs `T::dispose` when the instance's owner ends.
    pub fn disposable(mut self) -> Self {
        self.registration.disposer = Some(Arc::new(|instance: Instance| -> BoxFuture<'static, ()> {
            Box::pin(async move {
                if let Ok(service) = instance.downcast::<T>() {
                    service.dispose().await;
                }
            })
        }));
        self
    }
}

impl<T: Connector> ServiceDescriptor<T> {
    /// Marks the service as an external connection opened by `initialize()`.
    pub fn connects(mut self) -> Self {
        let connect = Arc::new(|instance: Instance| -> BoxFuture<'static, Result<String, (String, BoxError)>> {
            Box::pin(async move {
                let service = match instance.downcast::<T>() {
                    Ok(service) => service,
                    Err(_) => {
                        return Err((
                            std::any::type_name::<T>().to_string(),
                            "instance has an unexpected type".into(),
                        ))
                    }
                };
                let name = service.resource_name().to_string();
                match service.connect().await {
                    Ok(()) => Ok(name),
                    Err(e) => Err((name, e)),
                }
            })
        });
        let disconnect = Arc::new(|instance: Instance| -> BoxFuture<'static, ()> {
            Box::pin(async move {
                if let Ok(service) = instance.downcast::<T>() {
                    service.disconnect().await;
                }
            })
        });

        self.registration.connector = Some(ConnectHooks {
            connect,
            disconnect,
        });
        self
    }
}

impl<T> From<ServiceDescriptor<T>> for Registration {
    fn from(descriptor: ServiceDescriptor<T>) -> Self {
        descriptor.registration
    }
}

/// Read-only map from service key to registration.
#[derive(Clone, Default)]
pub struct Registry {
    registrations: HashMap<ServiceKey, Registration>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, key: &ServiceKey) -> Option<&Registration> {
        self.registrations.get(key)
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.registrations.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.values()
    }

    /// Sorted short names of every registered service.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .registrations
            .keys()
            .map(|key| key.short_name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Builds the "missing dependency" error for `key`, with a suggestion when
    /// a registered service has a similar name.
    pub(crate) fn missing(&self, key: &ServiceKey, requested_by: Option<&ServiceKey>) -> ContainerError {
        let wanted = key.short_name().to_lowercase();
        let suggestion = self
            .registrations
            .keys()
            .map(|k| k.short_name())
            .find(|name| {
                let name = name.to_lowercase();
                name.contains(&wanted) || wanted.contains(&name)
            })
            .map(str::to_string);

        ContainerError::MissingDependency {
            service: key.type_name().to_string(),
            requested_by: requested_by.map(|k| k.type_name().to_string()),
            available_services: self.service_names(),
            suggestion,
        }
    }

    fn validate(&self) -> Result<(), ContainerError> {
        for registration in self.registrations.values() {
            if registration.is_connector() && registration.lifetime != ServiceLifetime::Singleton {
                return Err(ContainerError::InvalidRegistration {
                    service: registration.key.type_name().to_string(),
                    reason: format!(
                        "connectors must be singletons, found {}",
                        registration.lifetime
                    ),
                });
            }

            for dependency in &registration.dependencies {
                if !self.registrations.contains_key(dependency) {
                    return Err(self.missing(dependency, Some(&registration.key)));
                }
            }

            for dependency in registration.declared_edges() {
                // 可选依赖允许未注册
                let Some(target) = self.registrations.get(dependency) else {
                    continue;
                };

                if registration.lifetime == ServiceLifetime::Singleton
                    && target.lifetime == ServiceLifetime::Scoped
                {
                    warn!(
                        service = registration.key.short_name(),
                        dependency = dependency.short_name(),
                        "singleton depends on a scoped service; it will be resolved from the bootstrap scope"
                    );
                }
            }
        }

        self.detect_declared_cycles()
    }

    // 基于声明依赖的深度优先搜索
    fn detect_declared_cycles(&self) -> Result<(), ContainerError> {
        let mut finished: HashSet<ServiceKey> = HashSet::new();

        let mut keys: Vec<&ServiceKey> = self.registrations.keys().collect();
        keys.sort_by_key(|k| k.type_name());

        for start in keys {
            let mut path: Vec<ServiceKey> = Vec::new();
            self.visit(*start, &mut path, &mut finished)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        key: ServiceKey,
        path: &mut Vec<ServiceKey>,
        finished: &mut HashSet<ServiceKey>,
    ) -> Result<(), ContainerError> {
        if finished.contains(&key) {
            return Ok(());
        }
        if let Some(position) = path.iter().position(|k| *k == key) {
            let mut chain: Vec<String> = path[position..]
                .iter()
                .map(|k| k.short_name().to_string())
                .collect();
            chain.push(key.short_name().to_string());
            return Err(ContainerError::CircularDependency { chain });
        }

        path.push(key);
        if let Some(registration) = self.registrations.get(&key) {
            for dependency in registration.declared_edges() {
                self.visit(*dependency, path, finished)?;
            }
        }
        path.pop();
        finished.insert(key);
        Ok(())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("services", &self.service_names())
            .finish()
    }
}

/// Collects registrations and validates them in [`RegistryBuilder::build`].
#[derive(Default)]
pub struct RegistryBuilder {
    registrations: HashMap<ServiceKey, Registration>,
    duplicates: Vec<ServiceKey>,
}

impl RegistryBuilder {
    pub fn register<T>(self, descriptor: ServiceDescriptor<T>) -> Self {
        self.add(Registration::from(descriptor))
    }

    pub fn add(mut self, registration: Registration) -> Self {
        let key = registration.key;
        if self.registrations.insert(key, registration).is_some() {
            self.duplicates.push(key);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn build(self) -> Result<Registry, ContainerError> {
        if let Some(key) = self.duplicates.first() {
            return Err(ContainerError::DuplicateRegistration {
                service: key.type_name().to_string(),
            });
        }

        let registry = Registry {
            registrations: self.registrations,
        };
        registry.validate()?;
        Ok(registry)
    }
}
