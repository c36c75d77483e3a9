//! 实时推送模块：带指数退避重连的 WebSocket 封装与按事件名分发。
//!
//! # Realtime Socket
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ReconnectingSocket`] | One logical connection with backoff reconnects |
//! | [`SocketConfig`] | `reconnect_interval`, `max_reconnect_attempts` |
//! | [`EventBus`] / [`Subscription`] | Named-event fan-out and state observers |
//! | [`Connector`] | Seam for opening connections; [`TungsteniteConnector`] by default |
//! | [`SocketMessage`] | `{"event", "data"}` frame |
//!
//! The socket URL is `<ws_url>?token=<token>`, with the token read from the
//! credential store on every attempt. Attempt `n` waits
//! `reconnect_interval * 2^(n-1)`. After `max_reconnect_attempts` the socket
//! stops quietly; subscribers see a final `Closed` state and nothing else.

mod client;
mod connector;
mod message;
mod subscriptions;

pub use client::{backoff_delay, ReconnectingSocket, SocketConfig};
pub use connector::{Connection, Connector, FrameSink, FrameStream, TungsteniteConnector};
pub use message::SocketMessage;
pub use subscriptions::{ConnectionState, EventBus, Subscription};
