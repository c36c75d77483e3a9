use crate::transport::{Transport, TransportError};
use crate::types::{ApiRequest, ApiResponse};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

/// A canned reply for [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl MockReply {
    pub fn ok(body: serde_json::Value) -> Self {
        Self::status(200).with_body(body)
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: serde_json::Value::Null,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: ApiRequest,
    pub at: Instant,
}

/// In-memory transport for tests: replays scripted replies in order and records calls.
///
/// Once the script is exhausted the fallback reply (if any) is served; without a
/// fallback the call fails like an unreachable server.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<MockReply>>,
    fallback: Option<MockReply>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: MockReply) -> Self {
        self.push(reply);
        self
    }

    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    pub fn push(&self, reply: MockReply) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                request: request.clone(),
                at: Instant::now(),
            });

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let reply = next.or_else(|| self.fallback.clone()).ok_or_else(|| {
            TransportError::Other(format!("no scripted reply for {} {}", request.method, request.url))
        })?;

        let mut response =
            ApiResponse::new(reply.status, Arc::new(request.clone())).with_body(reply.body);
        for (name, value) in reply.headers {
            response = response.with_header(name, value);
        }
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
