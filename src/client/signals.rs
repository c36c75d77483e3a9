use crate::cache::CacheStats;
use crate::resilience::RateLimitSnapshot;

/// Point-in-time facts about a client, for dashboards and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SignalsSnapshot {
    pub rate_limit: RateLimitSnapshot,
    pub cache: CacheStats,
    /// Live cache entries.
    pub cache_entries: usize,
    /// Jobs waiting in the request queue.
    pub queued: usize,
    pub authenticated: bool,
}
