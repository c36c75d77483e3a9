use crate::types::ApiRequest;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Response envelope produced by a transport (or replayed from the cache).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Header names are stored lower-cased.
    pub headers: BTreeMap<String, String>,
    /// JSON payload; non-JSON bodies are kept as a JSON string, empty bodies as `null`.
    pub body: serde_json::Value,
    pub request: Arc<ApiRequest>,
    pub from_cache: bool,
}

impl ApiResponse {
    pub fn new(status: u16, request: Arc<ApiRequest>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: serde_json::Value::Null,
            request,
            from_cache: false,
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn header_u64(&self, name: &str) -> Option<u64> {
        self.header(name)?.parse().ok()
    }

    /// Signed variant: servers occasionally report negative remaining budgets.
    pub fn header_i64(&self, name: &str) -> Option<i64> {
        self.header(name)?.parse().ok()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Message the server attached to an error body, if any.
    ///
    /// Looks at `message`, then `error` (string), then `error.message`, then a
    /// bare string body.
    pub fn server_message(&self) -> Option<String> {
        let body = &self.body;
        let candidate = body
            .get("message")
            .and_then(|v| v.as_str())
            .or_else(|| body.get("error").and_then(|v| v.as_str()))
            .or_else(|| {
                body.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|v| v.as_str())
            })
            .or_else(|| body.as_str());
        candidate
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Converts a non-2xx response into [`Error::Http`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Http {
                status: self.status,
                response: Box::new(self),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: serde_json::Value) -> ApiResponse {
        ApiResponse::new(status, Arc::new(ApiRequest::get("/x"))).with_body(body)
    }

    #[test]
    fn test_server_message_lookup_order() {
        assert_eq!(
            response(400, json!({"message": "title is required"})).server_message(),
            Some("title is required".to_string())
        );
        assert_eq!(
            response(400, json!({"error": "bad token"})).server_message(),
            Some("bad token".to_string())
        );
        assert_eq!(
            response(500, json!({"error": {"message": "db down"}})).server_message(),
            Some("db down".to_string())
        );
        assert_eq!(
            response(502, json!("upstream closed")).server_message(),
            Some("upstream closed".to_string())
        );
        assert_eq!(response(500, json!({"message": "  "})).server_message(), None);
        assert_eq!(response(500, serde_json::Value::Null).server_message(), None);
    }

    #[test]
    fn test_error_for_status() {
        assert!(response(204, serde_json::Value::Null)
            .error_for_status()
            .is_ok());
        let err = response(404, json!({})).error_for_status().unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_header_parsing() {
        let resp = response(200, json!({}))
            .with_header("X-RateLimit-Remaining", " 7 ")
            .with_header("x-ratelimit-reset", "-1");
        assert_eq!(resp.header_u64("x-ratelimit-remaining"), Some(7));
        assert_eq!(resp.header_u64("x-ratelimit-reset"), None);
        assert_eq!(resp.header_i64("x-ratelimit-reset"), Some(-1));
    }
}
