use crate::config::ClientConfig;
use crate::transport::{Transport, TransportError};
use crate::types::{ApiRequest, ApiResponse, MultipartField, RequestBody};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Proxy;
use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_source("http_transport"),
            )
        })?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(
                env::var("CLASSDESK_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(16),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("CLASSDESK_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is appended to the base URL path.
    fn resolve(&self, url: &str) -> Result<Url> {
        let joined = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.as_str().trim_end_matches('/'),
                url.trim_start_matches('/')
            )
        };
        Url::parse(&joined).map_err(|e| {
            Error::validation_with_context(
                format!("invalid request URL: {}", e),
                ErrorContext::new()
                    .with_details(joined.clone())
                    .with_source("http_transport"),
            )
        })
    }

    fn build_form(fields: &[MultipartField]) -> Result<Form> {
        let mut form = Form::new();
        for field in fields {
            form = match field {
                MultipartField::Text { name, value } => form.text(name.clone(), value.clone()),
                MultipartField::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let mut part = Part::bytes(bytes.to_vec()).file_name(file_name.clone());
                    if let Some(ct) = content_type {
                        part = part.mime_str(ct).map_err(TransportError::Http)?;
                    }
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }

    fn decode_body(headers: &BTreeMap<String, String>, bytes: &[u8]) -> Result<serde_json::Value> {
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        let declared_json = headers
            .get("content-type")
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);
        match serde_json::from_slice(bytes) {
            Ok(value) => Ok(value),
            Err(e) if declared_json => Err(Error::Serialization(e)),
            Err(_) => Ok(serde_json::Value::String(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.resolve(&request.url)?;
        let mut builder = self.client.request(request.method.into(), url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(fields) => builder.multipart(Self::build_form(fields)?),
        };

        let resp = builder.send().await.map_err(TransportError::Http)?;
        let status = resp.status().as_u16();
        let headers: BTreeMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|s| (k.as_str().to_ascii_lowercase(), s.to_string()))
            })
            .collect();
        let bytes = resp.bytes().await.map_err(TransportError::Http)?;
        let body = Self::decode_body(&headers, &bytes)?;

        Ok(ApiResponse {
            status,
            headers,
            body,
            request: Arc::new(request.clone()),
            from_cache: false,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        let config = ClientConfig {
            base_url: base.to_string(),
            ..ClientConfig::default()
        };
        HttpTransport::new(&config).unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let t = transport("http://localhost:8080/api/");
        assert_eq!(
            t.resolve("/feedback").unwrap().as_str(),
            "http://localhost:8080/api/feedback"
        );
        assert_eq!(
            t.resolve("users/me").unwrap().as_str(),
            "http://localhost:8080/api/users/me"
        );
        assert_eq!(
            t.resolve("https://cdn.example.com/a.pdf").unwrap().as_str(),
            "https://cdn.example.com/a.pdf"
        );
    }

    #[test]
    fn test_decode_body() {
        let mut headers = BTreeMap::new();
        assert_eq!(
            HttpTransport::decode_body(&headers, b"").unwrap(),
            serde_json::Value::Null
        );
        assert_eq!(
            HttpTransport::decode_body(&headers, b"plain text").unwrap(),
            serde_json::Value::String("plain text".into())
        );
        headers.insert("content-type".into(), "application/json".into());
        assert!(matches!(
            HttpTransport::decode_body(&headers, b"{not json"),
            Err(Error::Serialization(_))
        ));
    }
}
