//! Error classes surfaced to callers.
//!
//! Every failure that leaves the client is tagged with one [`ErrorClass`]. The
//! class decides the user-facing message and tells callers whether trying again
//! could help.
//!
//! | Class          | Typical cause                             |
//! |----------------|-------------------------------------------|
//! | `network`      | server unreachable, connection reset      |
//! | `timeout`      | request exceeded its deadline             |
//! | `unauthorized` | HTTP 401, session expired                 |
//! | `forbidden`    | HTTP 403                                  |
//! | `not_found`    | HTTP 404                                  |
//! | `validation`   | other HTTP 4xx                            |
//! | `rate_limited` | HTTP 429                                  |
//! | `server`       | HTTP 5xx                                  |
//! | `client`       | malformed body, local I/O failure         |
//! | `unknown`      | anything else                             |
//!
//! ```rust
//! use classdesk_client::error_class::ErrorClass;
//!
//! let class = ErrorClass::from_http_status(429);
//! assert_eq!(class.name(), "rate_limited");
//! assert!(class.retryable());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Network,
    Timeout,
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Server,
    Client,
    Unknown,
}

impl ErrorClass {
    /// Returns the stable name (e.g., `"not_found"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::RateLimited => "rate_limited",
            Self::Server => "server",
            Self::Client => "client",
            Self::Unknown => "unknown",
        }
    }

    /// Whether repeating the same call later could succeed.
    ///
    /// This is a hint for callers only; the client itself never retries
    /// except for the single rate-limit case.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Server
        )
    }

    /// Returns the category: `"connectivity"`, `"client"`, `"rate"`, `"server"`, `"local"` or `"unknown"`.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Network | Self::Timeout => "connectivity",
            Self::Unauthorized | Self::Forbidden | Self::NotFound | Self::Validation => "client",
            Self::RateLimited => "rate",
            Self::Server => "server",
            Self::Client => "local",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let class = match name {
            "network" => Self::Network,
            "timeout" => Self::Timeout,
            "unauthorized" => Self::Unauthorized,
            "forbidden" => Self::Forbidden,
            "not_found" => Self::NotFound,
            "validation" => Self::Validation,
            "rate_limited" => Self::RateLimited,
            "server" => Self::Server,
            "client" => Self::Client,
            "unknown" => Self::Unknown,
            _ => return None,
        };
        Some(class)
    }

    /// Maps an HTTP status code to its class.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            429 => Self::RateLimited,
            400..=499 => Self::Validation,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
