//! Mock push-channel server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections and count them
//! - Push text frames to every connected client
//! - Drop every open connection on demand

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone)]
enum Outbound {
    Frame(String),
    Kick,
}

/// A mock push-channel server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    outbound_tx: broadcast::Sender<Outbound>,
    connections: Arc<AtomicU32>,
}

impl MockWsServer {
    /// Start a new mock server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicU32::new(0));
        let (outbound_tx, _) = broadcast::channel::<Outbound>(64);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let outbound = outbound_tx.clone();
        let connections_clone = connections.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        // Subscribe before the handshake completes so no frame
                        // pushed after the client sees Connected is missed.
                        let rx = outbound.subscribe();
                        connections_clone.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(handle_connection(stream, rx));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            outbound_tx,
            connections,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the number of connections received.
    pub fn connection_count(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    /// Push a text frame to every connected client.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.outbound_tx.send(Outbound::Frame(text.into()));
    }

    /// Push a `newReading` event.
    pub fn push_reading(&self, id: &str, timestamp: &str, speed: f64, temperature: f64) {
        self.push(
            serde_json::json!({
                "event": "newReading",
                "data": {
                    "id": id,
                    "timestamp": timestamp,
                    "speed": speed,
                    "temperature": temperature,
                    "status": "normal"
                }
            })
            .to_string(),
        );
    }

    /// Close every open connection with a close frame.
    pub fn kick_all(&self) {
        let _ = self.outbound_tx.send(Outbound::Kick);
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(stream: TcpStream, mut outbound: broadcast::Receiver<Outbound>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = outbound.recv() => match msg {
                Ok(Outbound::Frame(text)) => {
                    if write.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(Outbound::Kick) | Err(_) => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        assert_eq!(server.connection_count(), 0);
        server.shutdown().await;
    }
}
