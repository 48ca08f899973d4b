//! 依赖注入容器的集成测试

#![allow(clippy::uninlined_format_args)]

use async_trait::async_trait;
use futures::future;
use parking_lot::Mutex;
use schoolspace::infrastructure::container::{
    BoxError, Connector, ContainerError, Dispose, Registry, Resolver, ServiceContainer,
    ServiceDescriptor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// 单例：缓存
#[derive(Debug)]
struct Cache;

/// 作用域：报表，依赖缓存
#[derive(Debug)]
struct Report {
    cache: Arc<Cache>,
}

/// 瞬态：计数器
#[derive(Debug)]
struct Ticket {
    serial: usize,
}

fn cache_report_registry() -> Registry {
    Registry::builder()
        .register(ServiceDescriptor::singleton(|_| async { Ok(Cache) }))
        .register(
            ServiceDescriptor::scoped(|resolver: Resolver| async move {
                Ok(Report {
                    cache: resolver.resolve::<Cache>().await?,
                })
            })
            .depends_on::<Cache>(),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_singleton_shared_across_scopes() {
    let container = ServiceContainer::new(cache_report_registry());

    let s1 = container.create_scope();
    let s2 = container.create_scope();
    let a = s1.resolve::<Cache>().await.unwrap();
    let b = s2.resolve::<Cache>().await.unwrap();
    let c = container.resolve_singleton::<Cache>().await.unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &c));
}

#[tokio::test]
async fn test_scoped_identity() {
    let container = ServiceContainer::new(cache_report_registry());

    let s1 = container.create_scope();
    let s2 = container.create_scope();

    let r1a = s1.resolve::<Report>().await.unwrap();
    let r1b = s1.resolve::<Report>().await.unwrap();
    let r2 = s2.resolve::<Report>().await.unwrap();

    // 同一作用域内相同，不同作用域间不同
    assert!(Arc::ptr_eq(&r1a, &r1b));
    assert!(!Arc::ptr_eq(&r1a, &r2));
    // 单例依赖在作用域之间共享
    assert!(Arc::ptr_eq(&r1a.cache, &r2.cache));
    assert_eq!(s1.instance_count(), 1);
}

#[tokio::test]
async fn test_transient_distinct_per_resolution() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();
    let registry = Registry::builder()
        .register(ServiceDescriptor::transient(move |_| {
            let serial = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move { Ok(Ticket { serial }) }
        }))
        .build()
        .unwrap();
    let container = ServiceContainer::new(registry);
    let scope = container.create_scope();

    let t1 = scope.resolve::<Ticket>().await.unwrap();
    let t2 = scope.resolve::<Ticket>().await.unwrap();

    assert!(!Arc::ptr_eq(&t1, &t2));
    assert_ne!(t1.serial, t2.serial);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(scope.instance_count(), 0); // 瞬态不缓存
}

#[tokio::test]
async fn test_missing_dependency_names_the_key() {
    let container = ServiceContainer::new(cache_report_registry());
    let scope = container.create_scope();

    let err = scope.resolve::<Ticket>().await.unwrap_err();
    match &err {
        ContainerError::MissingDependency {
            service,
            requested_by,
            available_services,
            ..
        } => {
            assert!(service.ends_with("Ticket"));
            assert!(requested_by.is_none());
            assert_eq!(available_services, &vec!["Cache".to_string(), "Report".to_string()]);
        }
        other => panic!("expected MissingDependency, got {}", other),
    }
    assert!(err.to_string().contains("Ticket"));
}

#[tokio::test]
async fn test_undeclared_dependency_is_rejected_at_resolution() {
    // 依赖已注册但未声明，解析时拒绝
    let registry = Registry::builder()
        .register(ServiceDescriptor::singleton(|_| async { Ok(Cache) }))
        .register(ServiceDescriptor::scoped(|resolver: Resolver| async move {
            Ok(Report {
                cache: resolver.resolve::<Cache>().await?,
            })
        }))
        .build()
        .unwrap();
    let container = ServiceContainer::new(registry);

    let err = container.create_scope().resolve::<Report>().await.unwrap_err();
    match err {
        ContainerError::InvalidRegistration { service, reason } => {
            assert!(service.ends_with("Report"));
            assert!(reason.contains("Cache"));
        }
        other => panic!("expected InvalidRegistration, got {}", other),
    }
}

#[derive(Debug)]
struct Mailer;

#[derive(Debug)]
struct Signup {
    mailer: Option<Arc<Mailer>>,
}

#[tokio::test]
async fn test_optional_dependency_declaration() {
    let registry = Registry::builder()
        .register(
            ServiceDescriptor::scoped(|resolver: Resolver| async move {
                Ok(Signup {
                    mailer: resolver.resolve_optional::<Mailer>().await?,
                })
            })
            .optionally_depends_on::<Mailer>(),
        )
        .register(ServiceDescriptor::scoped(|resolver: Resolver| async move {
            resolver.resolve_optional::<Mailer>().await?;
            Ok(Ticket { serial: 0 })
        }))
        .build()
        .unwrap();
    let container = ServiceContainer::new(registry);
    let scope = container.create_scope();

    let signup = scope.resolve::<Signup>().await.unwrap();
    assert!(signup.mailer.is_none());

    // 未声明的可选依赖同样被拒绝
    let err = scope.resolve::<Ticket>().await.unwrap_err();
    assert!(matches!(err, ContainerError::InvalidRegistration { .. }));
}

#[tokio::test]
async fn test_optional_unregistered_is_none() {
    let container = ServiceContainer::new(cache_report_registry());
    let scope = container.create_scope();

    assert!(scope.resolve_optional::<Ticket>().await.unwrap().is_none());
    assert!(scope.resolve_optional::<Cache>().await.unwrap().is_some());
}

#[derive(Debug)]
struct Sibling;

#[derive(Debug)]
struct Part {
    sibling: Arc<Sibling>,
}

#[derive(Debug)]
struct Assembly {
    first: Arc<Part>,
    second: Arc<Part>,
}

#[tokio::test]
async fn test_scoped_with_transient_dependency() {
    let registry = Registry::builder()
        .register(ServiceDescriptor::singleton(|_| async { Ok(Sibling) }))
        .register(
            ServiceDescriptor::transient(|resolver: Resolver| async move {
                Ok(Part {
                    sibling: resolver.resolve::<Sibling>().await?,
                })
            })
            .depends_on::<Sibling>(),
        )
        .register(
            ServiceDescriptor::scoped(|resolver: Resolver| async move {
                Ok(Assembly {
                    first: resolver.resolve::<Part>().await?,
                    second: resolver.resolve::<Part>().await?,
                })
            })
            .depends_on::<Part>(),
        )
        .build()
        .unwrap();
    let container = ServiceContainer::new(registry);

    let assembly = container.create_scope().resolve::<Assembly>().await.unwrap();

    assert!(!Arc::ptr_eq(&assembly.first, &assembly.second));
    assert!(Arc::ptr_eq(&assembly.first.sibling, &assembly.second.sibling));
}

#[derive(Debug)]
struct Ping;
#[derive(Debug)]
struct Pong;

#[test]
fn test_declared_cycle_fails_build() {
    let result = Registry::builder()
        .register(
            ServiceDescriptor::scoped(|resolver: Resolver| async move {
                resolver.resolve::<Pong>().await?;
                Ok(Ping)
            })
            .depends_on::<Pong>(),
        )
        .register(
            ServiceDescriptor::scoped(|resolver: Resolver| async move {
                resolver.resolve::<Ping>().await?;
                Ok(Pong)
            })
            .depends_on::<Ping>(),
        )
        .build();

    match result {
        Err(ContainerError::CircularDependency { chain }) => {
            assert_eq!(chain, vec!["Ping", "Pong", "Ping"]);
        }
        Err(other) => panic!("expected CircularDependency, got {}", other),
        Ok(_) => panic!("expected CircularDependency"),
    }
}

#[test]
fn test_self_dependency_fails_build() {
    let result = Registry::builder()
        .register(
            ServiceDescriptor::singleton(|resolver: Resolver| async move {
                resolver.resolve::<Cache>().await?;
                Ok(Cache)
            })
            .depends_on::<Cache>(),
        )
        .build();

    let err = result.unwrap_err();
    assert!(matches!(err, ContainerError::CircularDependency { .. }));
    assert!(err.to_string().contains("Cache -> Cache"));
}

#[tokio::test]
async fn test_undeclared_cycle_fails_without_deadlock() {
    let registry = Registry::builder()
        .register(ServiceDescriptor::scoped(|resolver: Resolver| async move {
            resolver.resolve::<Pong>().await?;
            Ok(Ping)
        }))
        .register(ServiceDescriptor::scoped(|resolver: Resolver| async move {
            resolver.resolve::<Ping>().await?;
            Ok(Pong)
        }))
        .build()
        .unwrap();
    let container = ServiceContainer::new(registry);

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        container.create_scope().resolve::<Ping>(),
    )
    .await
    .expect("cycle must not deadlock");

    assert!(matches!(result, Err(ContainerError::InvalidRegistration { .. })));
}

#[derive(Debug)]
struct Left;
#[derive(Debug)]
struct Right;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_undeclared_mutual_singletons_from_two_scopes_do_not_deadlock() {
    // 两个单例互相依赖且未声明，分别从两个作用域并发解析
    let registry = Registry::builder()
        .register(ServiceDescriptor::singleton(|resolver: Resolver| async move {
            sleep(Duration::from_millis(50)).await;
            resolver.resolve::<Right>().await?;
            Ok(Left)
        }))
        .register(ServiceDescriptor::singleton(|resolver: Resolver| async move {
            sleep(Duration::from_millis(50)).await;
            resolver.resolve::<Left>().await?;
            Ok(Right)
        }))
        .build()
        .unwrap();
    let container = ServiceContainer::new(registry);
    let s1 = container.create_scope();
    let s2 = container.create_scope();

    let (left, right) = tokio::time::timeout(Duration::from_secs(3), async {
        tokio::join!(s1.resolve::<Left>(), s2.resolve::<Right>())
    })
    .await
    .expect("mutual singletons must not deadlock");

    assert!(matches!(left, Err(ContainerError::InvalidRegistration { .. })));
    assert!(matches!(right, Err(ContainerError::InvalidRegistration { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_singleton_constructed_once() {
    let creations = Arc::new(AtomicUsize::new(0));
    let creations_clone = creations.clone();
    let registry = Registry::builder()
        .register(ServiceDescriptor::singleton(move |_| {
            let creations = creations_clone.clone();
            async move {
                creations.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                Ok(Cache)
            }
        }))
        .build()
        .unwrap();
    let container = ServiceContainer::new(registry);

    let mut handles = vec![];
    for _ in 0..50 {
        let container = container.clone();
        handles.push(tokio::spawn(async move {
            let scope = container.create_scope();
            let cache = scope.resolve::<Cache>().await.unwrap();
            scope.dispose().await;
            cache
        }));
    }

    let results = future::join_all(handles).await;
    let instances: Vec<Arc<Cache>> = results.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(creations.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));

    let stats = container.stats();
    assert_eq!(stats.singleton_cache_misses, 1);
    assert_eq!(stats.singleton_cache_hits, 49);
    assert_eq!(stats.active_singletons, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_scope_constructs_scoped_once() {
    let creations = Arc::new(AtomicUsize::new(0));
    let creations_clone = creations.clone();
    let registry = Registry::builder()
        .register(ServiceDescriptor::scoped(move |_| {
            let creations = creations_clone.clone();
            async move {
                creations.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(10)).await;
                Ok(Ticket { serial: 1 })
            }
        }))
        .build()
        .unwrap();
    let container = ServiceContainer::new(registry);
    let scope = container.create_scope();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let scope = scope.clone();
            tokio::spawn(async move { scope.resolve::<Ticket>().await.unwrap() })
        })
        .collect();
    let tickets: Vec<Arc<Ticket>> = future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(creations.load(Ordering::SeqCst), 1);
    assert!(tickets.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[tokio::test]
async fn test_failed_factory_is_not_cached() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();
    let registry = Registry::builder()
        .register(ServiceDescriptor::singleton(move |_| {
            let attempt = attempts_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(ContainerError::creation_failed(
                        "Cache",
                        std::io::Error::other("warming up"),
                    ))
                } else {
                    Ok(Cache)
                }
            }
        }))
        .build()
        .unwrap();
    let container = ServiceContainer::new(registry);
    let scope = container.create_scope();

    let err = scope.resolve::<Cache>().await.unwrap_err();
    assert!(matches!(err, ContainerError::ServiceCreationFailed { .. }));
    assert!(std::error::Error::source(&err).is_some());

    assert!(scope.resolve::<Cache>().await.is_ok());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(container.stats().failed_resolutions, 1);
}

/// 记录释放顺序的服务
#[derive(Debug)]
struct Tracked<const N: usize> {
    log: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl<const N: usize> Dispose for Tracked<N> {
    async fn dispose(&self) {
        self.log.lock().push(N);
    }
}

fn tracked_registry(log: Arc<Mutex<Vec<usize>>>) -> Registry {
    let log1 = log.clone();
    let log2 = log.clone();
    let log3 = log;
    Registry::builder()
        .register(
            ServiceDescriptor::scoped(move |_| {
                let log = log1.clone();
                async move { Ok(Tracked::<1> { log }) }
            })
            .disposable(),
        )
        .register(
            ServiceDescriptor::scoped(move |resolver: Resolver| {
                let log = log2.clone();
                async move {
                    resolver.resolve::<Tracked<1>>().await?;
                    Ok(Tracked::<2> { log })
                }
            })
            .depends_on::<Tracked<1>>()
            .disposable(),
        )
        .register(
            ServiceDescriptor::transient(move |_| {
                let log = log3.clone();
                async move { Ok(Tracked::<3> { log }) }
            })
            .disposable(),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_dispose_runs_once_in_reverse_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = ServiceContainer::new(tracked_registry(log.clone()));
    let scope = container.create_scope();

    scope.resolve::<Tracked<2>>().await.unwrap(); // 先构造 1，再构造 2
    scope.resolve::<Tracked<3>>().await.unwrap();
    scope.resolve::<Tracked<3>>().await.unwrap();

    assert_eq!(scope.dispose().await, 4);
    assert_eq!(*log.lock(), vec![3, 3, 2, 1]);

    // 再次释放无效果
    assert_eq!(scope.dispose().await, 0);
    assert_eq!(log.lock().len(), 4);
    assert!(scope.is_disposed());
    assert_eq!(scope.instance_count(), 0);
}

#[tokio::test]
async fn test_resolve_after_dispose_fails() {
    let container = ServiceContainer::new(cache_report_registry());
    let scope = container.create_named_scope("job");
    scope.dispose().await;

    let err = scope.resolve::<Report>().await.unwrap_err();
    match err {
        ContainerError::ScopeError {
            scope_id,
            scope_name,
            ..
        } => {
            assert_eq!(scope_id, scope.id());
            assert_eq!(scope_name, "job");
        }
        other => panic!("expected ScopeError, got {}", other),
    }
}

#[tokio::test]
async fn test_dropped_scope_disposes_in_background() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = ServiceContainer::new(tracked_registry(log.clone()));

    {
        let scope = container.create_scope();
        scope.resolve::<Tracked<2>>().await.unwrap();
        assert_eq!(container.stats().active_scopes, 1);
    }
    assert_eq!(container.stats().active_scopes, 0);

    for _ in 0..50 {
        if log.lock().len() == 2 {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(*log.lock(), vec![2, 1]);
}

#[derive(Debug)]
struct Socket {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

#[async_trait]
impl Connector for Socket {
    fn resource_name(&self) -> &str {
        "socket"
    }

    async fn connect(&self) -> Result<(), BoxError> {
        sleep(Duration::from_millis(5)).await;
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_initialize_connects_once_under_concurrency() {
    let registry = Registry::builder()
        .register(
            ServiceDescriptor::singleton(|_| async {
                Ok(Socket {
                    connects: AtomicUsize::new(0),
                    disconnects: AtomicUsize::new(0),
                })
            })
            .connects(),
        )
        .build()
        .unwrap();
    let container = ServiceContainer::new(registry);

    let calls: Vec<_> = (0..10)
        .map(|_| {
            let container = container.clone();
            tokio::spawn(async move { container.initialize().await })
        })
        .collect();
    for result in future::join_all(calls).await {
        result.unwrap().unwrap();
    }
    container.initialize().await.unwrap();

    let socket = container.resolve_singleton::<Socket>().await.unwrap();
    assert_eq!(socket.connects.load(Ordering::SeqCst), 1);

    container.shutdown().await;
    container.shutdown().await;
    assert_eq!(socket.disconnects.load(Ordering::SeqCst), 1);
}

#[test]
fn test_connector_must_be_singleton() {
    let result = Registry::builder()
        .register(
            ServiceDescriptor::scoped(|_| async {
                Ok(Socket {
                    connects: AtomicUsize::new(0),
                    disconnects: AtomicUsize::new(0),
                })
            })
            .connects(),
        )
        .build();

    assert!(matches!(result, Err(ContainerError::InvalidRegistration { .. })));
}

#[tokio::test]
async fn test_stats_track_lifetimes() {
    let container = ServiceContainer::new(cache_report_registry());
    let scope = container.create_scope();

    scope.resolve::<Report>().await.unwrap();
    scope.resolve::<Report>().await.unwrap();

    let stats = container.stats();
    assert_eq!(stats.total_resolutions, 3); // Report, Cache, Report
    assert_eq!(stats.singleton_cache_misses, 1);
    assert_eq!(stats.scoped_creations, 1);
    assert_eq!(stats.scoped_cache_hits, 1);
    assert_eq!(stats.scopes_created, 1);
    assert_eq!(stats.active_scopes, 1);
    assert_eq!(stats.registered_services, 2);
    assert!((stats.cache_hit_rate() - 100.0 / 3.0).abs() < 1e-9);
}
