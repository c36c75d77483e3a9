use crate::interceptors::{ErrorFlow, Interceptor, RequestFlow, REQUEST_ID_HEADER};
use crate::types::{ApiRequest, ApiResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::debug;

/// Debug-level trace of each leg, keyed by the request id.
#[derive(Default)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn on_request(&self, request: &mut ApiRequest) -> Result<RequestFlow> {
        debug!(
            request_id = request.header_value(REQUEST_ID_HEADER).unwrap_or("-"),
            method = %request.method,
            url = request.url.as_str(),
            attempt = request.attempt(),
            "dispatching request"
        );
        Ok(RequestFlow::Continue)
    }

    async fn on_response(&self, response: &mut ApiResponse) -> Result<()> {
        debug!(
            request_id = response.request.header_value(REQUEST_ID_HEADER).unwrap_or("-"),
            status = response.status,
            "response received"
        );
        Ok(())
    }

    async fn on_error(&self, request: &ApiRequest, error: Error) -> Result<ErrorFlow> {
        debug!(
            request_id = request.header_value(REQUEST_ID_HEADER).unwrap_or("-"),
            class = error.class().name(),
            status = error.status(),
            error = %error,
            "request failed"
        );
        Ok(ErrorFlow::Continue(error))
    }
}
