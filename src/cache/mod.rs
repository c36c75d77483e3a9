//! 响应缓存模块：为幂等读请求提供带 TTL 与容量上限的内存缓存。
//!
//! # Response Cache
//!
//! Cacheable `GET` requests are answered from memory while their entry is live,
//! so repeated dashboard reads do not hit the network.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheInterceptor`] | Pipeline hook that serves and stores entries, with statistics |
//! | [`CacheConfig`] | `enabled`, `ttl`, `max_size` |
//! | [`CacheBackend`] | Trait for storage backends |
//! | [`MemoryCache`] | Bounded map, FIFO eviction by write time |
//! | [`NullCache`] | No-op backend used when caching is off |
//! | [`CacheKey`] | SHA-256 of method, URL and sorted query |
//!
//! ## Semantics
//!
//! - An entry is live while `now - stored_at < ttl`.
//! - After every write, the oldest entries by write time are evicted until the
//!   map holds at most `max_size` entries. Reads do not refresh an entry.
//! - Concurrent identical misses both go to the network; the last write wins.

mod backend;
mod interceptor;
mod key;

pub use backend::{CacheBackend, CachedResponse, MemoryCache, NullCache};
pub use interceptor::{CacheConfig, CacheInterceptor, CacheStats};
pub use key::CacheKey;
