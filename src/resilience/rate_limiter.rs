use crate::interceptors::{ErrorFlow, Interceptor, RequestFlow};
use crate::types::{ApiRequest, ApiResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Reset values above this are absolute epoch seconds; smaller ones are relative.
const EPOCH_THRESHOLD: u64 = 1_000_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Sleep used on a 429 that carries no usable `retry-after`.
    #[serde(rename = "default_retry_after_secs", with = "crate::config::duration_secs")]
    pub default_retry_after: Duration,
    /// Upper bound on the sleep a single `retry-after` can ask for.
    #[serde(rename = "max_retry_after_secs", with = "crate::config::duration_secs")]
    pub max_retry_after: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_retry_after: Duration::from_secs(60),
            max_retry_after: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub limit: Option<u64>,
    pub remaining: Option<i64>,
    /// Time left until the server-side window resets, if it lies in the future.
    pub reset_in: Option<Duration>,
}

impl RateLimitSnapshot {
    pub fn is_exhausted(&self) -> bool {
        matches!(self.remaining, Some(r) if r <= 0) && self.reset_in.is_some()
    }
}

#[derive(Debug, Default)]
struct State {
    limit: Option<u64>,
    remaining: Option<i64>,
    reset_at: Option<Instant>,
}

/// Budget reported by the server through `x-ratelimit-*` headers.
///
/// One instance is shared by every request of a client and by its request queue.
#[derive(Debug, Default)]
pub struct RateLimiter {
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whatever rate-limit headers the response carries.
    pub async fn update_from_headers(&self, response: &ApiResponse) {
        let limit = response.header_u64(LIMIT_HEADER);
        let remaining = response.header_i64(REMAINING_HEADER);
        let reset = response.header(RESET_HEADER).and_then(parse_reset);
        if limit.is_none() && remaining.is_none() && reset.is_none() {
            return;
        }

        let mut st = self.state.lock().await;
        if limit.is_some() {
            st.limit = limit;
        }
        if remaining.is_some() {
            st.remaining = remaining;
        }
        match reset.and_then(|after| Instant::now().checked_add(after)) {
            Some(at) => st.reset_at = Some(at),
            None if reset.is_some() => {
                warn!("ignoring x-ratelimit-reset too far in the future");
            }
            None => {}
        }
    }

    /// Wait for the window to reset when the budget is spent, then return.
    pub async fn acquire(&self) -> Result<()> {
        let wait = {
            let st = self.state.lock().await;
            let now = Instant::now();
            match (st.remaining, st.reset_at) {
                (Some(rem), Some(reset_at)) if rem <= 0 && reset_at > now => {
                    Some(reset_at.duration_since(now))
                }
                _ => None,
            }
        };

        if let Some(wait) = wait {
            warn!(
                wait_ms = wait.as_millis() as u64,
                "rate limit budget exhausted, waiting for reset"
            );
            tokio::time::sleep(wait).await;
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> RateLimitSnapshot {
        let st = self.state.lock().await;
        let now = Instant::now();
        RateLimitSnapshot {
            limit: st.limit,
            remaining: st.remaining,
            reset_in: st
                .reset_at
                .filter(|at| *at > now)
                .map(|at| at.duration_since(now)),
        }
    }
}

fn parse_reset(raw: &str) -> Option<Duration> {
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    if value > EPOCH_THRESHOLD as f64 {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs_f64();
        Duration::try_from_secs_f64((value - now).max(0.0)).ok()
    } else {
        Duration::try_from_secs_f64(value).ok()
    }
}

/// Pipeline hook around the shared [`RateLimiter`].
///
/// Waits for the budget before dispatch, records headers after every call, and
/// turns a 429 into one sleep-then-retry.
pub struct RateLimitInterceptor {
    config: RateLimitConfig,
    limiter: Arc<RateLimiter>,
}

impl RateLimitInterceptor {
    pub fn new(config: RateLimitConfig, limiter: Arc<RateLimiter>) -> Self {
        Self { config, limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    fn retry_after(&self, response: &ApiResponse) -> Duration {
        response
            .header(RETRY_AFTER_HEADER)
            .and_then(|v| v.parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(self.config.default_retry_after)
            .min(self.config.max_retry_after)
    }
}

#[async_trait]
impl Interceptor for RateLimitInterceptor {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn on_request(&self, _request: &mut ApiRequest) -> Result<RequestFlow> {
        if self.config.enabled {
            self.limiter.acquire().await?;
        }
        Ok(RequestFlow::Continue)
    }

    async fn on_response(&self, response: &mut ApiResponse) -> Result<()> {
        if self.config.enabled {
            self.limiter.update_from_headers(response).await;
        }
        Ok(())
    }

    async fn on_error(&self, request: &ApiRequest, error: Error) -> Result<ErrorFlow> {
        if !self.config.enabled {
            return Ok(ErrorFlow::Continue(error));
        }
        let Error::Http { status, response } = &error else {
            return Ok(ErrorFlow::Continue(error));
        };
        self.limiter.update_from_headers(response).await;
        if *status != 429 {
            return Ok(ErrorFlow::Continue(error));
        }

        let wait = self.retry_after(response);
        warn!(
            method = %request.method,
            url = request.url.as_str(),
            retry_after_ms = wait.as_millis() as u64,
            "rate limited by server"
        );
        tokio::time::sleep(wait).await;

        if request.retry && !request.is_retry() {
            Ok(ErrorFlow::Retry(error))
        } else {
            Ok(ErrorFlow::Continue(error))
        }
    }
}
