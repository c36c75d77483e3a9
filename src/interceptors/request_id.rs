use crate::interceptors::{Interceptor, RequestFlow};
use crate::types::ApiRequest;
use crate::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags each request with a correlation id. The server may ignore it, but logs
/// on both sides can be linked through it.
#[derive(Default)]
pub struct RequestIdInterceptor;

impl RequestIdInterceptor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Interceptor for RequestIdInterceptor {
    fn name(&self) -> &'static str {
        "request_id"
    }

    async fn on_request(&self, request: &mut ApiRequest) -> Result<RequestFlow> {
        // keep the id stable across a re-dispatch
        request
            .headers
            .entry(REQUEST_ID_HEADER.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string());
        Ok(RequestFlow::Continue)
    }
}
