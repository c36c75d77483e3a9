//! Client configuration.
//!
//! Configuration can come from code, from a YAML file, or from `CLASSDESK_*`
//! environment variables. Anything left unset falls back to its default.

use crate::cache::CacheConfig;
use crate::resilience::RateLimitConfig;
use crate::socket::SocketConfig;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub ws_url: String,
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub socket: SocketConfig,
    /// Route the navigator is sent to when the server answers 401.
    pub login_route: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            timeout: Duration::from_secs(30),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            socket: SocketConfig::default(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Read overrides from `CLASSDESK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] but with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let num = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        if let Some(url) = lookup("CLASSDESK_API_URL") {
            cfg.base_url = url;
        }
        if let Some(url) = lookup("CLASSDESK_WS_URL") {
            cfg.ws_url = url;
        }
        if let Some(secs) = num("CLASSDESK_HTTP_TIMEOUT_SECS") {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = num("CLASSDESK_CACHE_TTL_SECS") {
            cfg.cache.ttl = Duration::from_secs(secs);
        }
        if let Some(size) = num("CLASSDESK_CACHE_MAX_SIZE") {
            cfg.cache.max_size = size as usize;
        }
        if let Some(secs) = num("CLASSDESK_RETRY_AFTER_SECS") {
            cfg.rate_limit.default_retry_after = Duration::from_secs(secs);
        }
        if let Some(ms) = num("CLASSDESK_WS_RECONNECT_MS") {
            cfg.socket.reconnect_interval = Duration::from_millis(ms);
        }
        if let Some(n) = num("CLASSDESK_WS_MAX_RECONNECTS") {
            cfg.socket.max_reconnect_attempts = n.min(u32::MAX as u64) as u32;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                "failed to parse client configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read {}", path.display()),
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, msg: String| {
            Err(Error::configuration_with_context(
                msg,
                ErrorContext::new()
                    .with_field_path(field)
                    .with_source("config_validator"),
            ))
        };

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return invalid(
                "base_url",
                format!("base_url must be an http(s) URL, got '{}'", self.base_url),
            );
        }
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return invalid(
                "ws_url",
                format!("ws_url must be a ws(s) URL, got '{}'", self.ws_url),
            );
        }
        if self.cache.enabled && self.cache.max_size == 0 {
            return invalid("cache.max_size", "cache.max_size must be at least 1".into());
        }
        if self.timeout.is_zero() {
            return invalid("timeout_secs", "timeout must be non-zero".into());
        }
        if !self.login_route.starts_with('/') {
            return invalid(
                "login_route",
                format!("login_route must start with '/', got '{}'", self.login_route),
            );
        }
        Ok(())
    }
}

pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
