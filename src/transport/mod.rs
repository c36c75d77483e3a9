//! Network transports.
//!
//! The pipeline talks to the network only through [`Transport`], so tests and
//! embedders can swap the reqwest-backed [`HttpTransport`] for [`MockTransport`].

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::{MockReply, MockTransport, RecordedCall};

use crate::types::{ApiRequest, ApiResponse};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatch one request. Non-2xx statuses are returned as responses, not errors.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    Socket(String),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Http(e) if e.is_timeout())
    }
}
