use crate::interceptors::{Interceptor, RequestFlow};
use crate::session::CredentialStore;
use crate::types::ApiRequest;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Adds `Authorization: Bearer <token>` when a token is stored.
///
/// The token is read on every request, so a login or logout takes effect on the next call.
/// A header set explicitly by the caller wins.
pub struct AuthInterceptor {
    store: Arc<dyn CredentialStore>,
}

impl AuthInterceptor {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Interceptor for AuthInterceptor {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn on_request(&self, request: &mut ApiRequest) -> Result<RequestFlow> {
        if let Some(token) = self.store.token() {
            request
                .headers
                .entry("authorization".to_string())
                .or_insert_with(|| format!("Bearer {}", token));
        }
        Ok(RequestFlow::Continue)
    }
}
