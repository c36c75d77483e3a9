use crate::cache::{CacheInterceptor, CacheStats};
use crate::client::error_classification::classify;
use crate::client::signals::SignalsSnapshot;
use crate::config::ClientConfig;
use crate::interceptors::InterceptorPipeline;
use crate::resilience::{RateLimitSnapshot, RateLimiter, RequestQueue};
use crate::session::{CredentialStore, Navigator};
use crate::socket::ReconnectingSocket;
use crate::transport::Transport;
use crate::types::{ApiRequest, ApiResponse, MultipartField};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

/// HTTP client for the ClassDesk API.
///
/// Cheap to clone; clones share the transport, the cache, the rate-limit state
/// and the credential store.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) pipeline: Arc<InterceptorPipeline>,
    pub(crate) cache: Arc<CacheInterceptor>,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    pub(crate) queue: RequestQueue,
    pub(crate) store: Arc<dyn CredentialStore>,
    pub(crate) navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Build a client with default collaborators (HTTP transport, in-memory credentials).
    pub fn new(config: ClientConfig) -> Result<Self> {
        crate::client::builder::ApiClientBuilder::new()
            .config(config)
            .build()
    }

    pub fn builder() -> crate::client::builder::ApiClientBuilder {
        crate::client::builder::ApiClientBuilder::new()
    }

    /// Run a request through the interceptor pipeline.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = request.method;
        let url = request.url.clone();
        let started = Instant::now();

        let result = self.pipeline.execute(request, self.transport.as_ref()).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(resp) => info!(
                %method,
                url = url.as_str(),
                status = resp.status,
                from_cache = resp.from_cache,
                duration_ms,
                "request completed"
            ),
            Err(e) => warn!(
                %method,
                url = url.as_str(),
                status = e.status(),
                class = e.class().name(),
                category = e.class().category(),
                duration_ms,
                "request failed"
            ),
        }
        result
    }

    /// Run a request through the single-worker queue instead of dispatching it directly.
    pub async fn enqueue(&self, request: ApiRequest) -> Result<ApiResponse> {
        let client = self.clone();
        self.queue
            .enqueue(move || async move { client.send(request).await })
            .await
    }

    /// `GET` a path and decode the JSON body.
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Self::decode(&self.send(ApiRequest::get(path)).await?)
    }

    /// `GET` with query parameters.
    pub async fn fetch_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |req, (k, v)| req.query(*k, v.clone()));
        Self::decode(&self.send(request).await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        Self::decode(&self.send(ApiRequest::post(path).json(body)).await?)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        Self::decode(&self.send(ApiRequest::put(path).json(body)).await?)
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        Self::decode(&self.send(ApiRequest::patch(path).json(body)).await?)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Multipart `POST`, used for file uploads.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: Vec<MultipartField>,
    ) -> Result<T> {
        Self::decode(&self.send(ApiRequest::post(path).multipart(fields)).await?)
    }

    /// Decode a JSON body; a body of the wrong shape is classified like any other failure.
    pub(crate) fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T> {
        response.json().map_err(classify)
    }

    pub async fn rate_limit(&self) -> RateLimitSnapshot {
        self.rate_limiter.snapshot().await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await
    }

    /// Drop cached reads under `prefix`, e.g. `/feedback` after submitting feedback.
    pub async fn invalidate_cache(&self, prefix: &str) -> Result<usize> {
        self.cache.invalidate(prefix).await
    }

    pub async fn signals(&self) -> SignalsSnapshot {
        SignalsSnapshot {
            rate_limit: self.rate_limiter.snapshot().await,
            cache: self.cache.stats(),
            cache_entries: self.cache.len().await.unwrap_or(0),
            queued: self.queue.pending(),
            authenticated: self.store.token().is_some(),
        }
    }

    /// A realtime socket that shares this client's credential store.
    pub fn socket(&self) -> ReconnectingSocket {
        ReconnectingSocket::new(
            self.config.ws_url.clone(),
            self.config.socket.clone(),
            self.store.clone(),
        )
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.pipeline.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error_classification::MALFORMED_MESSAGE;
    use crate::error_class::ErrorClass;
    use crate::session::{MemoryStore, RecordingNavigator};
    use crate::transport::{MockReply, MockTransport};
    use crate::Error;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn client_with(transport: Arc<MockTransport>) -> ApiClient {
        ApiClient::builder()
            .transport(transport)
            .credential_store(Arc::new(MemoryStore::with_token("t-1")))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_builtin_order() {
        let client = client_with(Arc::new(MockTransport::new()));
        assert_eq!(
            client.interceptor_names(),
            vec!["request_id", "auth", "cache", "rate_limit", "error_classifier", "logging"]
        );
        assert_eq!(client.transport_name(), "mock");
    }

    #[tokio::test]
    async fn test_identical_gets_hit_network_once() {
        let transport = Arc::new(
            MockTransport::new().with_reply(MockReply::ok(json!([{"id": 1, "title": "Essay"}]))),
        );
        let client = client_with(transport.clone());

        let req = || ApiRequest::get("/feedback").query("page", "1");
        let first = client.send(req()).await.unwrap();
        let second = client.send(req()).await.unwrap();

        assert_eq!(transport.call_count(), 1);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.body, second.body);
        assert_eq!(client.cache_stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_expires_after_ttl() {
        let transport = Arc::new(MockTransport::new().with_fallback(MockReply::ok(json!({"v": 1}))));
        let client = client_with(transport.clone());

        let _: Value = client.fetch("/analytics/overview").await.unwrap();
        tokio::time::advance(Duration::from_secs(299)).await;
        let _: Value = client.fetch("/analytics/overview").await.unwrap();
        assert_eq!(transport.call_count(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        let _: Value = client.fetch("/analytics/overview").await.unwrap();
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_auth_header_and_request_id() {
        let transport = Arc::new(MockTransport::new().with_reply(MockReply::ok(json!({}))));
        let client = client_with(transport.clone());

        let _: Value = client.post_json("/feedback", &json!({"text": "ok"})).await.unwrap();

        let sent = &transport.calls()[0].request;
        assert_eq!(sent.header_value("authorization"), Some("Bearer t-1"));
        assert!(sent.header_value("x-request-id").is_some());
    }

    #[tokio::test]
    async fn test_401_logs_out() {
        let transport = Arc::new(MockTransport::new().with_reply(MockReply::status(401)));
        let store = Arc::new(MemoryStore::with_token("t-1"));
        let nav = Arc::new(RecordingNavigator::new());
        let client = ApiClient::builder()
            .transport(transport)
            .credential_store(store.clone())
            .navigator(nav.clone())
            .build()
            .unwrap();

        let err = client.fetch::<Value>("/users/me").await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Unauthorized);
        assert_eq!(store.token(), None);
        assert_eq!(nav.last().as_deref(), Some("/login"));
        assert!(!client.signals().await.authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_retries_once_after_retry_after() {
        let transport = Arc::new(
            MockTransport::new()
                .with_reply(MockReply::status(429).with_header("retry-after", "2"))
                .with_reply(MockReply::ok(json!({"ok": true}))),
        );
        let client = client_with(transport.clone());

        let resp = client.send(ApiRequest::get("/feedback")).await.unwrap();
        assert_eq!(resp.body, json!({"ok": true}));

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].at.duration_since(calls[0].at) >= Duration::from_secs(2));
        // the re-dispatch keeps the correlation id
        assert_eq!(
            calls[0].request.header_value("x-request-id"),
            calls[1].request.header_value("x-request-id")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_429_is_surfaced() {
        let transport = Arc::new(
            MockTransport::new()
                .with_fallback(MockReply::status(429).with_header("retry-after", "1")),
        );
        let client = client_with(transport.clone());

        let err = client.send(ApiRequest::get("/feedback")).await.unwrap_err();
        assert_eq!(transport.call_count(), 2);
        match err {
            Error::Api { class, message, .. } => {
                assert_eq!(class, ErrorClass::RateLimited);
                assert_eq!(message, "Too many requests. Please try again later.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_delays_next_request() {
        let transport = Arc::new(
            MockTransport::new()
                .with_reply(
                    MockReply::ok(json!([]))
                        .with_header("x-ratelimit-limit", "10")
                        .with_header("x-ratelimit-remaining", "0")
                        .with_header("x-ratelimit-reset", "5"),
                )
                .with_reply(MockReply::ok(json!([]))),
        );
        let client = client_with(transport.clone());

        client.send(ApiRequest::get("/a")).await.unwrap();
        assert_eq!(client.rate_limit().await.remaining, Some(0));
        client.send(ApiRequest::get("/b")).await.unwrap();

        let calls = transport.calls();
        assert!(calls[1].at.duration_since(calls[0].at) >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_enqueue_preserves_order() {
        let transport = Arc::new(MockTransport::new().with_fallback(MockReply::ok(json!({}))));
        let client = client_with(transport.clone());

        let mut handles = Vec::new();
        for i in 0..4 {
            let c = client.clone();
            handles.push(tokio::spawn(async move {
                c.enqueue(ApiRequest::post(format!("/jobs/{i}"))).await
            }));
            tokio::task::yield_now().await;
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let urls: Vec<String> = transport.calls().into_iter().map(|c| c.request.url).collect();
        assert_eq!(urls, vec!["/jobs/0", "/jobs/1", "/jobs/2", "/jobs/3"]);
    }

    #[tokio::test]
    async fn test_mismatched_body_is_classified() {
        #[derive(Debug, serde::Deserialize)]
        struct Feedback {
            #[allow(dead_code)]
            id: u64,
        }

        let transport = Arc::new(
            MockTransport::new().with_fallback(MockReply::ok(json!({"id": "not-a-number"}))),
        );
        let client = client_with(transport);

        let fetched = client.fetch::<Feedback>("/feedback/1").await.unwrap_err();
        let posted = client
            .post_json::<_, Feedback>("/feedback", &json!({"content": "ok"}))
            .await
            .unwrap_err();
        for err in [fetched, posted] {
            match err {
                Error::Api {
                    class,
                    status,
                    message,
                } => {
                    assert_eq!(class, ErrorClass::Client);
                    assert_eq!(status, None);
                    assert_eq!(message, MALFORMED_MESSAGE);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }
}
