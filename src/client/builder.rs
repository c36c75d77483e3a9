use crate::cache::CacheInterceptor;
use crate::client::core::ApiClient;
use crate::client::error_classification::ErrorClassifier;
use crate::config::ClientConfig;
use crate::interceptors::{
    AuthInterceptor, Interceptor, InterceptorPipeline, LoggingInterceptor, RequestIdInterceptor,
};
use crate::resilience::{RateLimitInterceptor, RateLimiter, RequestQueue};
use crate::session::{CredentialStore, LogNavigator, MemoryStore, Navigator};
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;
use tracing::debug;

/// Builder for [`ApiClient`].
///
/// Built-in interceptors always run first, in this order: request id, auth,
/// cache, rate limit, error classifier, logging. Interceptors added with
/// [`ApiClientBuilder::interceptor`] run after them.
pub struct ApiClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn CredentialStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    extra: Vec<Arc<dyn Interceptor>>,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            transport: None,
            store: None,
            navigator: None,
            extra: Vec::new(),
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the API base URL, e.g. to point at a mock server.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Use a custom transport. Default is [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Default is a fresh [`MemoryStore`].
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Receives the login redirect on 401. Default only logs.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn interceptor<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.extra.push(Arc::new(interceptor));
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        self.config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&self.config)?),
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn CredentialStore>);
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(LogNavigator) as Arc<dyn Navigator>);

        let cache = Arc::new(CacheInterceptor::new(self.config.cache.clone()));
        let rate_limiter = Arc::new(RateLimiter::new());

        let mut pipeline = InterceptorPipeline::new()
            .with(RequestIdInterceptor::new())
            .with(AuthInterceptor::new(store.clone()))
            .with_arc(cache.clone())
            .with(RateLimitInterceptor::new(
                self.config.rate_limit.clone(),
                rate_limiter.clone(),
            ))
            .with(ErrorClassifier::new(
                store.clone(),
                navigator.clone(),
                self.config.login_route.clone(),
            ))
            .with(LoggingInterceptor::new());
        for ic in self.extra {
            pipeline = pipeline.with_arc(ic);
        }

        debug!(
            base_url = self.config.base_url.as_str(),
            transport = transport.name(),
            store = store.name(),
            interceptors = pipeline.len(),
            "api client built"
        );

        Ok(ApiClient {
            config: Arc::new(self.config),
            transport,
            pipeline: Arc::new(pipeline),
            cache,
            queue: RequestQueue::new(rate_limiter.clone()),
            rate_limiter,
            store,
            navigator,
        })
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use crate::Error;

    struct Marker;

    #[async_trait::async_trait]
    impl Interceptor for Marker {
        fn name(&self) -> &'static str {
            "marker"
        }
    }

    #[test]
    fn test_user_interceptors_run_after_builtins() {
        let client = ApiClientBuilder::new()
            .transport(Arc::new(MockTransport::new()))
            .interceptor(Marker)
            .build()
            .unwrap();
        assert_eq!(client.interceptor_names().last(), Some(&"marker"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ApiClientBuilder::new()
            .base_url("not a url")
            .transport(Arc::new(MockTransport::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
