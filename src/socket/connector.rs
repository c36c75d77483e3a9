use crate::transport::TransportError;
use crate::Result;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait FrameStream: Send {
    /// Next text frame; `None` once the peer has closed the connection.
    async fn next_text(&mut self) -> Option<Result<String>>;
}

/// Both halves of an open connection.
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub stream: Box<dyn FrameStream>,
}

/// Opens WebSocket connections for [`super::ReconnectingSocket`].
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Connection>;
}

/// Default connector backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn socket_error(e: impl std::fmt::Display) -> crate::Error {
    TransportError::Socket(e.to_string()).into()
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Connection> {
        let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(socket_error)?;
        let (sink, stream) = ws.split();
        Ok(Connection {
            sink: Box::new(TungsteniteSink(sink)),
            stream: Box::new(TungsteniteStream(stream)),
        })
    }
}

struct TungsteniteSink(SplitSink<WsStream, Message>);

#[async_trait]
impl FrameSink for TungsteniteSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.0.send(Message::Text(text)).await.map_err(socket_error)
    }

    async fn close(&mut self) -> Result<()> {
        self.0.close().await.map_err(socket_error)
    }
}

struct TungsteniteStream(SplitStream<WsStream>);

#[async_trait]
impl FrameStream for TungsteniteStream {
    async fn next_text(&mut self) -> Option<Result<String>> {
        loop {
            match self.0.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => debug!("ignoring non-utf8 binary frame"),
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(socket_error(e))),
            }
        }
    }
}
