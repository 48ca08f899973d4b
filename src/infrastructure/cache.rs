//! 内存键值存储
//!
//! 缓存与会话存储的进程内实现，支持 TTL。过期条目在读取时惰性删除，
//! 也可以通过 `purge_expired` 批量清理。

use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::infrastructure::container::{BoxError, Connector};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Value at '{0}' is not an integer")]
    NotAnInteger(String),
    #[error("Incrementing '{key}' by {by} overflows")]
    Overflow { key: String, by: i64 },
    #[error("Failed to (de)serialize value at '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

/// In-process cache/session store.
pub struct MemoryStore {
    name: String,
    entries: DashMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        // 惰性删除过期条目
        self.entries.remove_if(key, |_, stored| stored.is_expired(now));
        None
    }

    /// Stores `value`; `ttl` of `None` keeps it until deleted.
    pub fn set(&self, key: &str, value: impl Into<String>, ttl: Option<Duration>) {
        self.entries
            .insert(key.to_string(), StoredValue::new(value.into(), ttl));
    }

    /// Returns whether a live entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        matches!(self.entries.remove(key), Some((_, stored)) if !stored.is_expired(now))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Adds `by` to the integer stored at `key`, starting from 0 when the key
    /// is missing or expired. An existing TTL is kept.
    pub fn increment(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let stored = occupied.get_mut();
                if stored.is_expired(now) {
                    *stored = StoredValue::new(by.to_string(), None);
                    return Ok(by);
                }
                let current: i64 = stored
                    .value
                    .parse()
                    .map_err(|_| StoreError::NotAnInteger(key.to_string()))?;
                let next = current.checked_add(by).ok_or_else(|| StoreError::Overflow {
                    key: key.to_string(),
                    by,
                })?;
                stored.value = next.to_string();
                Ok(next)
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(StoredValue::new(by.to_string(), None));
                Ok(by)
            }
        }
    }

    /// Remaining lifetime of `key`; `None` when missing or without expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        entry.expires_at.map(|at| at.saturating_duration_since(now))
    }

    /// Replaces the value only when the current value equals `expected`
    /// (`None` meaning absent). Returns whether the swap happened.
    pub fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new_value: impl Into<String>,
        ttl: Option<Duration>,
    ) -> bool {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let current = if occupied.get().is_expired(now) {
                    None
                } else {
                    Some(occupied.get().value.as_str())
                };
                if current != expected {
                    return false;
                }
                occupied.insert(StoredValue::new(new_value.into(), ttl));
                true
            }
            MapEntry::Vacant(vacant) => {
                if expected.is_some() {
                    return false;
                }
                vacant.insert(StoredValue::new(new_value.into(), ttl));
                true
            }
        }
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key) {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreError::Serialization {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.set(key, raw, ttl);
        Ok(())
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Connector for MemoryStore {
    fn resource_name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), BoxError> {
        tracing::debug!(store = %self.name, "memory store ready");
        Ok(())
    }

    // 断开连接即丢弃全部条目
    async fn disconnect(&self) {
        self.entries.clear();
        tracing::debug!(store = %self.name, "memory store cleared");
    }
}
