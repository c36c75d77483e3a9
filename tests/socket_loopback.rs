//! ReconnectingSocket against a local tokio-tungstenite server.

use classdesk_client::socket::{ConnectionState, ReconnectingSocket, SocketConfig, SocketMessage};
use classdesk_client::MemoryStore;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// What the server saw on one connection.
#[derive(Debug)]
enum ServerEvent {
    Connected { uri: String },
    Received(String),
}

/// Accepts `connections` clients in turn. Each one is greeted with a
/// `feedback.created` event carrying its index; every connection but the
/// last is then closed by the server.
async fn spawn_server(connections: usize) -> (String, mpsc::UnboundedReceiver<ServerEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for index in 0..connections {
            let (tcp, _) = listener.accept().await.unwrap();
            let seen = tx.clone();
            let mut ws = tokio_tungstenite::accept_hdr_async(
                tcp,
                move |req: &Request, resp: Response| {
                    let _ = seen.send(ServerEvent::Connected {
                        uri: req.uri().to_string(),
                    });
                    Ok::<Response, ErrorResponse>(resp)
                },
            )
            .await
            .unwrap();

            let hello = SocketMessage::new("feedback.created", json!({ "id": index }))
                .encode()
                .unwrap();
            ws.send(Message::Text(hello)).await.unwrap();

            if index + 1 < connections {
                ws.close(None).await.unwrap();
                continue;
            }
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(text) = msg {
                    let _ = tx.send(ServerEvent::Received(text));
                }
            }
        }
    });

    (format!("ws://{addr}/ws"), rx)
}

fn socket(url: String) -> ReconnectingSocket {
    let config = SocketConfig {
        reconnect_interval: Duration::from_millis(50),
        max_reconnect_attempts: 3,
    };
    ReconnectingSocket::new(url, config, Arc::new(MemoryStore::with_token("ws-token")))
}

async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for the socket")
        .expect("channel closed")
}

#[tokio::test]
async fn test_events_flow_both_ways() {
    let (url, mut server) = spawn_server(1).await;
    let socket = socket(url);

    let (event_tx, mut events) = mpsc::unbounded_channel::<Value>();
    let (state_tx, mut states) = mpsc::unbounded_channel();
    let _sub = socket.subscribe("feedback.created", move |data| {
        let _ = event_tx.send(data.clone());
    });
    let _state = socket.on_state_change(move |state| {
        let _ = state_tx.send(state);
    });

    socket.connect().unwrap();

    match next(&mut server).await {
        ServerEvent::Connected { uri } => assert_eq!(uri, "/ws?token=ws-token"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(next(&mut states).await, ConnectionState::Open);
    assert_eq!(next(&mut events).await, json!({ "id": 0 }));

    assert!(socket.send("feedback.read", json!({ "id": 0 })).await.unwrap());
    match next(&mut server).await {
        ServerEvent::Received(text) => {
            let msg = SocketMessage::decode(&text).unwrap();
            assert_eq!(msg.event, "feedback.read");
            assert_eq!(msg.data, json!({ "id": 0 }));
        }
        other => panic!("unexpected {other:?}"),
    }

    socket.disconnect().await;
    assert_eq!(next(&mut states).await, ConnectionState::Closed);
    assert!(!socket.is_active());
    assert!(!socket.send("feedback.read", json!({})).await.unwrap());
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let (url, mut server) = spawn_server(2).await;
    let socket = socket(url);

    let (event_tx, mut events) = mpsc::unbounded_channel::<Value>();
    let _sub = socket.subscribe("feedback.created", move |data| {
        let _ = event_tx.send(data.clone());
    });

    socket.connect().unwrap();

    assert_eq!(next(&mut events).await, json!({ "id": 0 }));
    assert_eq!(next(&mut events).await, json!({ "id": 1 }));
    let mut connects = 0;
    while let Ok(Some(event)) = timeout(Duration::from_millis(100), server.recv()).await {
        if matches!(event, ServerEvent::Connected { .. }) {
            connects += 1;
        }
    }
    assert_eq!(connects, 2);
    assert!(socket.is_open());
    assert_eq!(socket.reconnect_attempts(), 0);

    socket.disconnect().await;
}

#[tokio::test]
async fn test_connect_requires_token() {
    let socket = ReconnectingSocket::new(
        "ws://127.0.0.1:9/ws",
        SocketConfig::default(),
        Arc::new(MemoryStore::new()),
    );
    assert!(socket.connect().is_err());
    assert!(!socket.is_active());
}
