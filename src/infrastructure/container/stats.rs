//! 容器统计信息

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// 内部容器统计信息（原子计数器）
#[derive(Default)]
pub(crate) struct StatsCounters {
    pub(crate) total_resolutions: AtomicU64,
    pub(crate) singleton_cache_hits: AtomicU64,
    pub(crate) singleton_cache_misses: AtomicU64,
    pub(crate) scoped_cache_hits: AtomicU64,
    pub(crate) scoped_creations: AtomicU64,
    pub(crate) transient_creations: AtomicU64,
    pub(crate) failed_resolutions: AtomicU64,
    pub(crate) scopes_created: AtomicU64,
    pub(crate) active_scopes: AtomicUsize,
    pub(crate) disposed_instances: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, registered_services: usize, active_singletons: usize) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.total_resolutions.load(Ordering::Relaxed),
            singleton_cache_hits: self.singleton_cache_hits.load(Ordering::Relaxed),
            singleton_cache_misses: self.singleton_cache_misses.load(Ordering::Relaxed),
            scoped_cache_hits: self.scoped_cache_hits.load(Ordering::Relaxed),
            scoped_creations: self.scoped_creations.load(Ordering::Relaxed),
            transient_creations: self.transient_creations.load(Ordering::Relaxed),
            failed_resolutions: self.failed_resolutions.load(Ordering::Relaxed),
            scopes_created: self.scopes_created.load(Ordering::Relaxed),
            active_scopes: self.active_scopes.load(Ordering::Relaxed),
            disposed_instances: self.disposed_instances.load(Ordering::Relaxed),
            registered_services,
            active_singletons,
        }
    }
}

/// 容器统计信息快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerStats {
    /// 总解析次数
    pub total_resolutions: u64,
    /// 单例缓存命中次数
    pub singleton_cache_hits: u64,
    /// 单例缓存未命中次数
    pub singleton_cache_misses: u64,
    pub scoped_cache_hits: u64,
    /// 作用域服务创建次数
    pub scoped_creations: u64,
    /// 瞬态服务创建次数
    pub transient_creations: u64,
    pub failed_resolutions: u64,
    pub scopes_created: u64,
    pub active_scopes: usize,
    pub disposed_instances: u64,
    /// 服务注册数量
    pub registered_services: usize,
    /// 活跃单例数量
    pub active_singletons: usize,
}

impl ContainerStats {
    /// 获取缓存命中率（百分比），单例与作用域缓存合并计算
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.singleton_cache_hits + self.scoped_cache_hits;
        let total = hits + self.singleton_cache_misses + self.scoped_creations;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    /// 获取服务创建分布 (singleton, scoped, transient)
    pub fn service_creation_distribution(&self) -> (u64, u64, u64) {
        (
            self.singleton_cache_misses,
            self.scoped_creations,
            self.transient_creations,
        )
    }

    /// 获取性能指标摘要
    pub fn performance_summary(&self) -> String {
        format!(
            "Container Performance: {} total resolutions, {:.1}% cache hit rate, {} registered services, {} active singletons, {} active scopes",
            self.total_resolutions,
            self.cache_hit_rate(),
            self.registered_services,
            self.active_singletons,
            self.active_scopes
        )
    }
}
