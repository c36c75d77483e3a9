//! Cache interceptor: serves live entries on the request leg, stores payloads on the response leg.

use super::backend::{CacheBackend, CachedResponse, MemoryCache, NullCache};
use super::key::CacheKey;
use crate::interceptors::{Interceptor, RequestFlow};
use crate::types::{ApiRequest, ApiResponse};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    #[serde(rename = "ttl_secs", with = "crate::config::duration_secs")]
    pub ttl: Duration,
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            max_size: 100,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Response cache for idempotent reads.
///
/// Only `GET` requests with `cached` left on take part.
pub struct CacheInterceptor {
    config: CacheConfig,
    backend: Arc<dyn CacheBackend>,
    stats: AtomicStats,
}

impl CacheInterceptor {
    pub fn new(config: CacheConfig) -> Self {
        let backend: Arc<dyn CacheBackend> = if config.enabled {
            Arc::new(MemoryCache::new(config.max_size))
        } else {
            Arc::new(NullCache::new())
        };
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            stats: AtomicStats::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn len(&self) -> Result<usize> {
        self.backend.len().await
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    /// Drop every cached entry whose path starts with `prefix`, e.g. after a write.
    pub async fn invalidate(&self, prefix: &str) -> Result<usize> {
        let removed = self.backend.invalidate_prefix(prefix).await?;
        debug!(prefix, removed, "cache entries invalidated");
        Ok(removed)
    }

    fn applies_to(&self, request: &ApiRequest) -> bool {
        self.config.enabled && request.cached && request.method.is_read()
    }
}

#[async_trait]
impl Interceptor for CacheInterceptor {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn on_request(&self, request: &mut ApiRequest) -> Result<RequestFlow> {
        if !self.applies_to(request) {
            return Ok(RequestFlow::Continue);
        }
        let key = CacheKey::for_request(request);
        match self.backend.get(&key).await? {
            Some(hit) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache hit");
                let mut response = ApiResponse::new(hit.status, Arc::new(request.clone()))
                    .with_body(hit.body);
                response.headers = hit.headers;
                response.from_cache = true;
                Ok(RequestFlow::Respond(response))
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache miss");
                Ok(RequestFlow::Continue)
            }
        }
    }

    async fn on_response(&self, response: &mut ApiResponse) -> Result<()> {
        if response.from_cache || !self.applies_to(&response.request) {
            return Ok(());
        }
        let key = CacheKey::for_request(&response.request);
        let entry = CachedResponse {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
        };
        let evicted = self.backend.set(&key, entry, self.config.ttl).await?;
        self.stats.sets.fetch_add(1, Ordering::Relaxed);
        if evicted > 0 {
            self.stats
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, "cache overflow evicted oldest entries");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_response(request: ApiRequest, body: serde_json::Value) -> ApiResponse {
        ApiResponse::new(200, Arc::new(request)).with_body(body)
    }

    #[tokio::test]
    async fn test_stores_then_serves_get() {
        let cache = CacheInterceptor::new(CacheConfig::default());
        let req = ApiRequest::get("/feedback").query("page", "1");

        let mut first = req.clone();
        assert!(matches!(
            cache.on_request(&mut first).await.unwrap(),
            RequestFlow::Continue
        ));
        let mut resp = ok_response(req.clone(), json!([{"id": 1}]));
        cache.on_response(&mut resp).await.unwrap();

        let mut second = req.clone();
        match cache.on_request(&mut second).await.unwrap() {
            RequestFlow::Respond(hit) => {
                assert!(hit.from_cache);
                assert_eq!(hit.body, json!([{"id": 1}]));
            }
            RequestFlow::Continue => panic!("expected a cache hit"),
        }
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                sets: 1,
                evictions: 0
            }
        );
    }

    #[tokio::test]
    async fn test_skips_writes_and_opt_outs() {
        let cache = CacheInterceptor::new(CacheConfig::default());

        let mut post = ok_response(ApiRequest::post("/feedback"), json!({"id": 2}));
        cache.on_response(&mut post).await.unwrap();
        let mut opted_out = ok_response(ApiRequest::get("/feedback").no_cache(), json!([]));
        cache.on_response(&mut opted_out).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 0);
        assert_eq!(cache.stats().sets, 0);
    }

    #[tokio::test]
    async fn test_disabled_config_uses_null_backend() {
        let cache = CacheInterceptor::new(CacheConfig::disabled());
        assert_eq!(cache.backend_name(), "null");
        let mut resp = ok_response(ApiRequest::get("/feedback"), json!([]));
        cache.on_response(&mut resp).await.unwrap();
        let mut req = ApiRequest::get("/feedback");
        assert!(matches!(
            cache.on_request(&mut req).await.unwrap(),
            RequestFlow::Continue
        ));
        assert_eq!(cache.stats().misses, 0);
    }

    #[tokio::test]
    async fn test_eviction_counted() {
        let cache = CacheInterceptor::new(CacheConfig::default().with_max_size(1));
        let mut a = ok_response(ApiRequest::get("/a"), json!(1));
        let mut b = ok_response(ApiRequest::get("/b"), json!(2));
        cache.on_response(&mut a).await.unwrap();
        cache.on_response(&mut b).await.unwrap();
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len().await.unwrap(), 1);
    }
}
