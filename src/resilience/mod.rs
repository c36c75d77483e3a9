//! 限流模块：跟踪服务端返回的配额，并在 429 时等待后重试一次。
//!
//! # Rate Limiting
//!
//! The server reports its budget through `x-ratelimit-limit`,
//! `x-ratelimit-remaining` and `x-ratelimit-reset`. The client keeps the latest
//! values in one shared [`RateLimiter`] and holds back new requests while the
//! budget is spent.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RateLimiter`] | Shared budget state, `acquire()` waits for the reset |
//! | [`RateLimitInterceptor`] | Pipeline hook: wait, record headers, 429 sleep-then-retry |
//! | [`RequestQueue`] | Single-worker FIFO that waits for budget before each job |
//! | [`RateLimitConfig`] | `enabled`, `default_retry_after`, `max_retry_after` |
//!
//! A `x-ratelimit-reset` above 10^9 is read as epoch seconds, anything smaller
//! as seconds from now.

mod queue;
mod rate_limiter;

pub use queue::RequestQueue;
pub use rate_limiter::{
    RateLimitConfig, RateLimitInterceptor, RateLimitSnapshot, RateLimiter, LIMIT_HEADER,
    REMAINING_HEADER, RESET_HEADER, RETRY_AFTER_HEADER,
};
