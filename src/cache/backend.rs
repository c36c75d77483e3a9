//! Cache backend implementations.

use super::key::CacheKey;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// The part of a response worth keeping. The originating request is
/// re-attached when the entry is replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct CacheEntry {
    key: CacheKey,
    value: CachedResponse,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) >= self.ttl
    }
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>>;
    /// Store `value`; returns how many entries were evicted to stay in bounds.
    async fn set(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) -> Result<usize>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    /// Drop every entry whose URL starts with `prefix`.
    async fn invalidate_prefix(&self, prefix: &str) -> Result<usize>;
    async fn clear(&self) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
}

/// Bounded in-memory cache with FIFO eviction.
///
/// Eviction picks the entry with the oldest write time, not the least recently
/// read one. Expired entries are only removed on lookup.
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries: max_entries.max(1),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn evict_overflow(&self, entries: &mut HashMap<String, CacheEntry>) -> usize {
        let mut evicted = 0;
        while entries.len() > self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(&key.hash) {
            Some(entry) if entry.is_expired(Instant::now()) => true,
            Some(entry) => return Ok(Some(entry.value.clone())),
            None => return Ok(None),
        };
        if expired {
            entries.remove(&key.hash);
        }
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) -> Result<usize> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key.hash.clone(),
            CacheEntry {
                key: key.clone(),
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
        Ok(self.evict_overflow(&mut entries))
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key.hash)
            .is_some())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, e| !e.key.url.starts_with(prefix));
        Ok(before - entries.len())
    }

    async fn clear(&self) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|e| !e.is_expired(now))
            .count())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Backend used when caching is disabled.
#[derive(Default)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<CachedResponse>> {
        Ok(None)
    }
    async fn set(&self, _: &CacheKey, _: CachedResponse, _: Duration) -> Result<usize> {
        Ok(0)
    }
    async fn delete(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }
    async fn invalidate_prefix(&self, _: &str) -> Result<usize> {
        Ok(0)
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
