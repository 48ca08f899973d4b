#![allow(clippy::uninlined_format_args, clippy::print_stdout)]
//! 依赖注入容器的性能基准测试

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures_util::future;
use schoolspace::{Registry, Resolver, ServiceContainer, ServiceDescriptor};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// 单例配置
struct Settings {
    retries: u32,
}

/// 作用域服务，依赖单例
struct Session {
    settings: Arc<Settings>,
}

/// 瞬态服务
struct Token {
    value: u64,
}

fn bench_container() -> ServiceContainer {
    let registry = Registry::builder()
        .register(ServiceDescriptor::singleton(|_| async { Ok(Settings { retries: 3 }) }))
        .register(
            ServiceDescriptor::scoped(|resolver: Resolver| async move {
                Ok(Session {
                    settings: resolver.resolve::<Settings>().await?,
                })
            })
            .depends_on::<Settings>(),
        )
        .register(ServiceDescriptor::transient(|_| async { Ok(Token { value: 42 }) }))
        .build()
        .unwrap();
    ServiceContainer::new(registry)
}

/// 基准测试：已缓存单例的解析
fn bench_singleton_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let container = bench_container();
    let scope = container.create_scope();
    runtime.block_on(scope.resolve::<Settings>()).unwrap();

    c.bench_function("singleton_resolution", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let settings = scope.resolve::<Settings>().await.unwrap();
                black_box(settings.retries)
            })
        });
    });
}

/// 基准测试：作用域创建 + 作用域服务解析 + 释放
fn bench_scoped_request(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let container = bench_container();

    let mut group = c.benchmark_group("scoped_request");
    for resolutions in [1usize, 10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(resolutions),
            resolutions,
            |b, &resolutions| {
                b.iter(|| {
                    runtime.block_on(async {
                        let scope = container.create_scope();
                        for _ in 0..resolutions {
                            let session = scope.resolve::<Session>().await.unwrap();
                            black_box(session.settings.retries);
                        }
                        scope.dispose().await
                    })
                });
            },
        );
    }
    group.finish();
}

/// 基准测试：瞬态服务解析
fn bench_transient_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let container = bench_container();
    let scope = container.create_scope();

    c.bench_function("transient_resolution", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let token = scope.resolve::<Token>().await.unwrap();
                black_box(token.value)
            })
        });
    });
}

/// 基准测试：并发请求作用域
fn bench_concurrent_scopes(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let container = bench_container();

    let mut group = c.benchmark_group("concurrent_scopes");
    for concurrency in [10usize, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            concurrency,
            |b, &concurrency| {
                b.iter(|| {
                    runtime.block_on(async {
                        let tasks = (0..concurrency).map(|_| {
                            let container = container.clone();
                            async move {
                                let scope = container.create_scope();
                                let session = scope.resolve::<Session>().await.unwrap();
                                scope.dispose().await;
                                session.settings.retries
                            }
                        });
                        black_box(future::join_all(tasks).await)
                    })
                });
            },
        );
    }
    group.finish();

    println!("{}", container.stats().performance_summary());
}

criterion_group!(
    benches,
    bench_singleton_resolution,
    bench_scoped_request,
    bench_transient_resolution,
    bench_concurrent_scopes
);
criterion_main!(benches);
