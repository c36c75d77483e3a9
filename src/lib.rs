//! # classdesk-client
//!
//! ClassDesk 作业与反馈平台的客户端层：带拦截器管线的 HTTP 客户端与自动重连的 WebSocket。
//!
//! Client layer for the ClassDesk assignment and feedback platform.
//!
//! ## Overview
//!
//! Every REST call goes through one ordered interceptor pipeline: a request id
//! and the bearer token are attached, cacheable reads are answered from
//! memory, the server's rate-limit budget is respected, and failures are
//! classified into user-facing errors. Realtime updates arrive over a
//! WebSocket that reconnects with exponential backoff.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use classdesk_client::services::FeedbackService;
//! use classdesk_client::{ApiClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> classdesk_client::Result<()> {
//!     let client = ApiClient::new(ClientConfig::from_env()?)?;
//!     client.store().set_token("token-from-login")?;
//!
//!     let page = FeedbackService::new(&client).list(1).await?;
//!     println!("{} feedback entries", page.items.len());
//!
//!     let socket = client.socket();
//!     let _sub = socket.subscribe("feedback.created", |data| println!("new: {data}"));
//!     socket.connect()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ApiClient`], its builder and the error classifier |
//! | [`interceptors`] | Interceptor trait and pipeline, auth, request id, logging |
//! | [`cache`] | TTL response cache with FIFO eviction |
//! | [`resilience`] | Server rate-limit tracking and the request queue |
//! | [`socket`] | Reconnecting WebSocket with named-event fan-out |
//! | [`services`] | Typed feedback, analytics, profile and upload endpoints |
//! | [`session`] | Credential stores and the navigation hook |
//! | [`transport`] | reqwest transport and an in-memory mock |
//! | [`export`] | Text, CSV and JSON export |
//! | [`config`] | [`ClientConfig`] from code, YAML or environment |

pub mod cache;
pub mod client;
pub mod config;
pub mod error_class;
pub mod export;
pub mod interceptors;
pub mod resilience;
pub mod services;
pub mod session;
pub mod socket;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{ApiClient, ApiClientBuilder, SignalsSnapshot};
pub use config::ClientConfig;
pub use error_class::ErrorClass;
pub use interceptors::{ErrorFlow, Interceptor, RequestFlow};
pub use session::{CredentialStore, KeyringStore, MemoryStore, Navigator};
pub use socket::{ConnectionState, ReconnectingSocket};
pub use types::{ApiRequest, ApiResponse, Method};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
