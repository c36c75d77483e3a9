use super::connector::{Connection, Connector, FrameSink, FrameStream, TungsteniteConnector};
use super::message::SocketMessage;
use super::subscriptions::{ConnectionState, EventBus, Subscription};
use crate::session::CredentialStore;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Base delay; attempt `n` waits `reconnect_interval * 2^(n-1)`, saturating at
    /// `Duration::MAX` once the product no longer fits.
    #[serde(rename = "reconnect_interval_ms", with = "crate::config::duration_millis")]
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_millis(1000),
            max_reconnect_attempts: 5,
        }
    }
}

/// Delay before reconnect attempt `attempt` (1-based).
pub fn backoff_delay(interval: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| interval.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}

struct Shared {
    ws_url: String,
    config: SocketConfig,
    store: Arc<dyn CredentialStore>,
    connector: Arc<dyn Connector>,
    bus: EventBus,
    sink: Mutex<Option<Box<dyn FrameSink>>>,
    open: AtomicBool,
    /// Set by `disconnect`; an aborted supervisor may still be between awaits.
    closing: AtomicBool,
    attempts: AtomicU32,
    supervisor: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// One logical WebSocket connection that re-establishes itself with exponential backoff.
///
/// A single supervisor task owns the connect/read/backoff cycle. Cloning the
/// handle shares the same connection and subscriber tables.
#[derive(Clone)]
pub struct ReconnectingSocket {
    shared: Arc<Shared>,
}

impl ReconnectingSocket {
    pub fn new(
        ws_url: impl Into<String>,
        config: SocketConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self::with_connector(ws_url, config, store, Arc::new(TungsteniteConnector))
    }

    pub fn with_connector(
        ws_url: impl Into<String>,
        config: SocketConfig,
        store: Arc<dyn CredentialStore>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                ws_url: ws_url.into(),
                config,
                store,
                connector,
                bus: EventBus::new(),
                sink: Mutex::new(None),
                open: AtomicBool::new(false),
                closing: AtomicBool::new(false),
                attempts: AtomicU32::new(0),
                supervisor: std::sync::Mutex::new(None),
            }),
        }
    }

    /// Start the connection. A no-op while a connection is open or a reconnect is pending.
    ///
    /// Fails only when no token is stored; connection failures are handled by
    /// the reconnect cycle.
    pub fn connect(&self) -> Result<()> {
        if self.shared.store.token().is_none() {
            return Err(Error::validation_with_context(
                "no token stored; log in before opening the socket",
                ErrorContext::new().with_source("socket"),
            ));
        }
        // reject a bad URL up front rather than burning reconnect attempts on it
        self.shared.url_with_token("")?;

        let mut supervisor = self
            .shared
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if supervisor.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("socket already connected or reconnecting");
            return Ok(());
        }
        self.shared.attempts.store(0, Ordering::SeqCst);
        self.shared.closing.store(false, Ordering::SeqCst);
        *supervisor = Some(tokio::spawn(self.shared.clone().supervise()));
        Ok(())
    }

    /// Close the connection and cancel any pending reconnect.
    pub async fn disconnect(&self) {
        self.shared.closing.store(true, Ordering::SeqCst);
        let handle = self
            .shared
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }

        let sink = self.shared.sink.lock().await.take();
        if let Some(mut sink) = sink {
            if let Err(e) = sink.close().await {
                debug!(error = %e, "error while closing socket");
            }
        }
        self.shared.attempts.store(0, Ordering::SeqCst);
        if self.shared.open.swap(false, Ordering::SeqCst) {
            info!("socket disconnected");
            self.shared.bus.notify_state(ConnectionState::Closed);
        }
    }

    /// Send one frame. Returns `false` when the socket is not open; the message is dropped.
    pub async fn send(&self, event: &str, data: Value) -> Result<bool> {
        if !self.is_open() {
            error!(event, "socket is not open, dropping message");
            return Ok(false);
        }
        let text = SocketMessage::new(event, data).encode()?;
        let mut sink = self.shared.sink.lock().await;
        match sink.as_mut() {
            Some(sink) => {
                sink.send_text(text).await?;
                Ok(true)
            }
            None => {
                error!(event, "socket is not open, dropping message");
                Ok(false)
            }
        }
    }

    pub fn subscribe<F>(&self, event: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.shared.bus.subscribe(event, callback)
    }

    pub fn on_state_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.shared.bus.on_state_change(callback)
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// True while the supervisor is connected, connecting or waiting to reconnect.
    pub fn is_active(&self) -> bool {
        self.shared
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SocketConfig {
        &self.shared.config
    }
}

impl Shared {
    fn url_with_token(&self, token: &str) -> Result<Url> {
        let mut url = Url::parse(&self.ws_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid socket URL '{}'", self.ws_url),
                ErrorContext::new()
                    .with_field_path("ws_url")
                    .with_details(e.to_string()),
            )
        })?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    async fn open_connection(&self) -> Result<Connection> {
        let token = self
            .store
            .token()
            .ok_or_else(|| Error::validation("token removed from store"))?;
        let url = self.url_with_token(&token)?;
        self.connector.connect(&url).await
    }

    async fn supervise(self: Arc<Self>) {
        loop {
            match self.open_connection().await {
                Ok(Connection { mut sink, stream }) => {
                    {
                        // disconnect takes this lock before clearing `open`
                        let mut slot = self.sink.lock().await;
                        if self.closing.load(Ordering::SeqCst) {
                            drop(slot);
                            if let Err(e) = sink.close().await {
                                debug!(error = %e, "error while closing socket");
                            }
                            debug!("socket opened after disconnect, dropping it");
                            return;
                        }
                        self.attempts.store(0, Ordering::SeqCst);
                        *slot = Some(sink);
                        self.open.store(true, Ordering::SeqCst);
                        info!(url = self.ws_url.as_str(), "socket connected");
                        self.bus.notify_state(ConnectionState::Open);
                    }

                    self.pump(stream).await;

                    self.sink.lock().await.take();
                    self.open.store(false, Ordering::SeqCst);
                    info!("socket closed");
                    self.bus.notify_state(ConnectionState::Closed);
                }
                Err(e) => warn!(error = %e, "socket connect failed"),
            }

            if self.closing.load(Ordering::SeqCst) {
                return;
            }
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt > self.config.max_reconnect_attempts {
                warn!(
                    attempts = self.config.max_reconnect_attempts,
                    "socket reconnect attempts exhausted, giving up"
                );
                self.attempts
                    .store(self.config.max_reconnect_attempts, Ordering::SeqCst);
                return;
            }
            let delay = backoff_delay(self.config.reconnect_interval, attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "scheduling socket reconnect");
            tokio::time::sleep(delay).await;
        }
    }

    async fn pump(&self, mut stream: Box<dyn FrameStream>) {
        while let Some(frame) = stream.next_text().await {
            match frame {
                Ok(text) => match SocketMessage::decode(&text) {
                    Ok(msg) => {
                        let delivered = self.bus.dispatch(&msg);
                        debug!(event = msg.event.as_str(), delivered, "socket event");
                    }
                    Err(e) => warn!(error = %e, "ignoring undecodable socket frame"),
                },
                Err(e) => {
                    warn!(error = %e, "socket read failed");
                    break;
                }
            }
        }
    }
}
