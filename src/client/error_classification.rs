//! Error classification: turns raw HTTP and transport failures into user-facing [`Error::Api`] values.

use crate::error_class::ErrorClass;
use crate::interceptors::{ErrorFlow, Interceptor};
use crate::session::{CredentialStore, Navigator};
use crate::types::ApiRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, warn};

pub const UNAUTHORIZED_MESSAGE: &str = "Your session has expired. Please log in again.";
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
pub const NOT_FOUND_MESSAGE: &str = "The requested resource was not found.";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";
pub const GENERIC_MESSAGE: &str = "An unexpected error occurred. Please try again.";
pub const NETWORK_MESSAGE: &str = "Unable to reach the server. Check your connection and try again.";
pub const TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";
pub const MALFORMED_MESSAGE: &str = "The server sent a response that could not be read.";

/// How a status code is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    pub class: ErrorClass,
    /// Fixed message; `None` means use the server's message or the generic fallback.
    pub message: Option<&'static str>,
    /// Clear stored credentials and navigate to the login route.
    pub logout: bool,
}

const POLICIES: &[(u16, StatusPolicy)] = &[
    (
        401,
        StatusPolicy {
            class: ErrorClass::Unauthorized,
            message: Some(UNAUTHORIZED_MESSAGE),
            logout: true,
        },
    ),
    (
        403,
        StatusPolicy {
            class: ErrorClass::Forbidden,
            message: Some(FORBIDDEN_MESSAGE),
            logout: false,
        },
    ),
    (
        404,
        StatusPolicy {
            class: ErrorClass::NotFound,
            message: Some(NOT_FOUND_MESSAGE),
            logout: false,
        },
    ),
    (
        429,
        StatusPolicy {
            class: ErrorClass::RateLimited,
            message: Some(RATE_LIMITED_MESSAGE),
            logout: false,
        },
    ),
];

pub fn policy_for(status: u16) -> StatusPolicy {
    POLICIES
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, policy)| *policy)
        .unwrap_or(StatusPolicy {
            class: ErrorClass::from_http_status(status),
            message: None,
            logout: false,
        })
}

/// Rewrite a raw failure into [`Error::Api`]. Already classified and local errors
/// are returned unchanged.
pub fn classify(err: Error) -> Error {
    match err {
        Error::Http { status, response } => {
            let policy = policy_for(status);
            let message = match policy.message {
                Some(fixed) => fixed.to_string(),
                None => response
                    .server_message()
                    .unwrap_or_else(|| GENERIC_MESSAGE.to_string()),
            };
            Error::Api {
                class: policy.class,
                status: Some(status),
                message,
            }
        }
        Error::Transport(e) => {
            let (class, message) = if e.is_timeout() {
                (ErrorClass::Timeout, TIMEOUT_MESSAGE)
            } else {
                (ErrorClass::Network, NETWORK_MESSAGE)
            };
            warn!(error = %e, class = class.name(), "transport failure");
            Error::Api {
                class,
                status: None,
                message: message.to_string(),
            }
        }
        Error::Serialization(e) => {
            warn!(error = %e, "malformed response body");
            Error::Api {
                class: ErrorClass::Client,
                status: None,
                message: MALFORMED_MESSAGE.to_string(),
            }
        }
        other => other,
    }
}

/// Last built-in hook of the error leg: applies [`classify`] and performs the
/// forced logout on 401.
pub struct ErrorClassifier {
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

impl ErrorClassifier {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            store,
            navigator,
            login_route: login_route.into(),
        }
    }

    fn force_logout(&self) {
        if let Err(e) = self.store.clear_session() {
            error!(store = self.store.name(), error = %e, "failed to clear credentials");
        }
        self.navigator.navigate(&self.login_route);
    }
}

#[async_trait]
impl Interceptor for ErrorClassifier {
    fn name(&self) -> &'static str {
        "error_classifier"
    }

    async fn on_error(&self, request: &ApiRequest, err: Error) -> Result<ErrorFlow> {
        if let Some(status) = err.status().filter(|_| matches!(err, Error::Http { .. })) {
            if policy_for(status).logout {
                warn!(
                    method = %request.method,
                    url = request.url.as_str(),
                    route = self.login_route.as_str(),
                    "unauthorized, clearing session"
                );
                self.force_logout();
            }
        }
        Ok(ErrorFlow::Continue(classify(err)))
    }
}
