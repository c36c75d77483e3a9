//! Benchmarks for the response cache
//!
//! This benchmark measures:
//! - Cache key hashing for typical list requests
//! - Lookup cost in a full cache
//! - Insert cost once the cache is at capacity (FIFO eviction)

use classdesk_client::cache::{CacheBackend, CacheKey, CachedResponse, MemoryCache};
use classdesk_client::ApiRequest;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::runtime::Runtime;

const TTL: Duration = Duration::from_secs(300);

fn page_entry(page: usize) -> CachedResponse {
    CachedResponse {
        status: 200,
        headers: BTreeMap::new(),
        body: json!([
            {"id": page * 2, "content": "Clear thesis, weak conclusion", "rating": 4},
            {"id": page * 2 + 1, "content": "Cite your sources", "rating": 3}
        ]),
    }
}

fn filled_cache(rt: &Runtime, size: usize) -> MemoryCache {
    let cache = MemoryCache::new(size);
    rt.block_on(async {
        for page in 0..size {
            let key = CacheKey::from_parts("GET", "/feedback", &format!("page={page}"));
            cache.set(&key, page_entry(page), TTL).await.unwrap();
        }
    });
    cache
}

fn bench_key(c: &mut Criterion) {
    let request = ApiRequest::get("/feedback")
        .query("page", "3")
        .query("assignment", "42");

    c.bench_function("cache_key/for_request", |b| {
        b.iter(|| CacheKey::for_request(black_box(&request)))
    });
}

fn bench_lookup(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("memory_cache");

    for size in [100usize, 1_000] {
        let cache = filled_cache(&rt, size);
        let hit = CacheKey::from_parts("GET", "/feedback", &format!("page={}", size / 2));
        let miss = CacheKey::from_parts("GET", "/feedback", "page=-1");

        group.bench_with_input(BenchmarkId::new("hit", size), &hit, |b, key| {
            b.to_async(&rt)
                .iter(|| async { cache.get(black_box(key)).await.unwrap() })
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &miss, |b, key| {
            b.to_async(&rt)
                .iter(|| async { cache.get(black_box(key)).await.unwrap() })
        });
        group.bench_function(BenchmarkId::new("insert_evicting", size), |b| {
            let mut next = size;
            b.to_async(&rt).iter(|| {
                next += 1;
                let key = CacheKey::from_parts("GET", "/feedback", &format!("page={next}"));
                let cache = &cache;
                async move { cache.set(&key, page_entry(next), TTL).await.unwrap() }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_key, bench_lookup);
criterion_main!(benches);
