//! Mock HTTP server setup for integration tests

#![allow(dead_code)]

use classdesk_client::session::RecordingNavigator;
use classdesk_client::{ApiClient, ClientConfig, MemoryStore};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::Arc;

pub const TOKEN: &str = "t-integration";

/// Test fixture owning a mock server and a client pointed at it
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub client: ApiClient,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Logged-in client; `tweak` adjusts the config before the client is built.
    pub async fn with_config(tweak: impl FnOnce(&mut ClientConfig)) -> Self {
        let server = Server::new_async().await;
        let mut config = ClientConfig::new(server.url());
        tweak(&mut config);

        let store = Arc::new(MemoryStore::with_token(TOKEN));
        let navigator = Arc::new(RecordingNavigator::new());
        let client = ApiClient::builder()
            .config(config)
            .credential_store(store.clone())
            .navigator(navigator.clone())
            .build()
            .expect("client should build against the mock server");

        Self {
            server,
            client,
            store,
            navigator,
        }
    }

    /// Create a mock for a JSON response
    pub async fn mock_json(&mut self, method: &str, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock(method, path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for `GET /feedback?page=N` expected to be hit `hits` times
    pub async fn mock_feedback_page(&mut self, page: u32, body: &str, hits: usize) -> Mock {
        self.server
            .mock("GET", "/feedback")
            .match_query(Matcher::UrlEncoded("page".into(), page.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}
