//! 拦截器管线：按注册顺序在请求/响应/错误三个阶段执行钩子。
//!
//! Interceptor pipeline.
//!
//! Every call goes through the same three legs:
//!
//! 1. `on_request` hooks, in registration order. A hook may short-circuit with a
//!    ready response (the cache does this), which skips the network and the
//!    response leg.
//! 2. The transport dispatch. Non-2xx statuses become [`Error::Http`].
//! 3. `on_response` hooks on success, or `on_error` hooks on failure, again in order.
//!
//! A hook returning `Err` aborts the remaining chain; that error reaches the caller.
//!
//! | Interceptor | Request leg | Response leg | Error leg |
//! |-------------|-------------|--------------|-----------|
//! | [`RequestIdInterceptor`] | tag `x-request-id` | – | – |
//! | [`AuthInterceptor`] | inject bearer token | – | – |
//! | [`crate::cache::CacheInterceptor`] | serve live entry | store payload | – |
//! | [`crate::resilience::RateLimitInterceptor`] | wait for budget reset | capture headers | capture headers, 429 sleep |
//! | [`crate::client::ErrorClassifier`] | – | – | classify, 401 logout |
//! | [`LoggingInterceptor`] | debug trace | debug trace | debug trace |

mod auth;
mod logging;
mod request_id;

pub use auth::AuthInterceptor;
pub use logging::LoggingInterceptor;
pub use request_id::{RequestIdInterceptor, REQUEST_ID_HEADER};

use crate::transport::Transport;
use crate::types::{ApiRequest, ApiResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Outcome of an `on_request` hook.
#[derive(Debug)]
pub enum RequestFlow {
    Continue,
    /// Resolve the call with this response without touching the network.
    Respond(ApiResponse),
}

/// Outcome of an `on_error` hook.
#[derive(Debug)]
pub enum ErrorFlow {
    /// Hand the (possibly rewritten) error to the next interceptor.
    Continue(Error),
    /// Stop the chain and dispatch the request again. Honoured once, and only
    /// for requests with `retry` set; otherwise treated as `Continue`.
    Retry(Error),
    /// Resolve the call with this response instead of failing.
    Recover(ApiResponse),
}

#[async_trait]
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str {
        "unnamed"
    }

    async fn on_request(&self, _request: &mut ApiRequest) -> Result<RequestFlow> {
        Ok(RequestFlow::Continue)
    }

    async fn on_response(&self, _response: &mut ApiResponse) -> Result<()> {
        Ok(())
    }

    async fn on_error(&self, _request: &ApiRequest, error: Error) -> Result<ErrorFlow> {
        Ok(ErrorFlow::Continue(error))
    }
}

enum ErrorResolution {
    Failed(Error),
    Recovered(ApiResponse),
    Retry,
}

/// Ordered list of interceptors, fixed at construction time.
#[derive(Clone, Default)]
pub struct InterceptorPipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorPipeline {
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    pub fn with<I: Interceptor + 'static>(self, interceptor: I) -> Self {
        self.with_arc(Arc::new(interceptor))
    }

    pub fn with_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|ic| ic.name()).collect()
    }

    /// Run one call through all three legs.
    pub async fn execute(
        &self,
        request: ApiRequest,
        transport: &dyn Transport,
    ) -> Result<ApiResponse> {
        let mut request = request;
        loop {
            for ic in &self.interceptors {
                if let RequestFlow::Respond(resp) = ic.on_request(&mut request).await? {
                    debug!(
                        interceptor = ic.name(),
                        method = %request.method,
                        url = request.url.as_str(),
                        "request short-circuited"
                    );
                    return Ok(resp);
                }
            }

            let outcome = match transport.send(&request).await {
                Ok(resp) => resp.error_for_status(),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(mut resp) => {
                    for ic in &self.interceptors {
                        ic.on_response(&mut resp).await?;
                    }
                    return Ok(resp);
                }
                Err(err) => match self.run_error_leg(&request, err).await? {
                    ErrorResolution::Failed(e) => return Err(e),
                    ErrorResolution::Recovered(resp) => return Ok(resp),
                    ErrorResolution::Retry => {
                        request.attempt += 1;
                        debug!(
                            method = %request.method,
                            url = request.url.as_str(),
                            attempt = request.attempt,
                            "re-dispatching request"
                        );
                    }
                },
            }
        }
    }

    async fn run_error_leg(&self, request: &ApiRequest, error: Error) -> Result<ErrorResolution> {
        let retry_allowed = request.retry && !request.is_retry();
        let mut current = error;
        for ic in &self.interceptors {
            current = match ic.on_error(request, current).await? {
                ErrorFlow::Continue(e) => e,
                ErrorFlow::Retry(_) if retry_allowed => return Ok(ErrorResolution::Retry),
                ErrorFlow::Retry(e) => e,
                ErrorFlow::Recover(resp) => return Ok(ErrorResolution::Recovered(resp)),
            };
        }
        Ok(ErrorResolution::Failed(current))
    }
}
