//! Push channel lifecycle integration tests.
//!
//! Tests the connection lifecycle over a real WebSocket:
//! - Connection establishment and event delivery
//! - Malformed frames
//! - Reconnection after a server-side drop
//! - Handshake failure

mod integration;
use integration::common::mock_ws::MockWsServer;

use motor_ws::{
    ConnectionConfig, ConnectionManager, ConnectionState, PushConnector, PushEvent, WsConnector,
    WsError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn manager(url: String) -> (Arc<ConnectionManager>, mpsc::Receiver<PushEvent>) {
    let config = ConnectionConfig {
        url: url.clone(),
        max_reconnect_attempts: 3,
        reconnect_base_delay_ms: 100,
        reconnect_max_delay_ms: 1000,
    };
    let (event_tx, event_rx) = mpsc::channel::<PushEvent>(100);
    let connector = Arc::new(WsConnector::new(url)) as Arc<dyn PushConnector>;
    (
        Arc::new(ConnectionManager::new(config, connector, event_tx)),
        event_rx,
    )
}

/// Wait for the first event matching `pred`, skipping others.
async fn next_matching(
    rx: &mut mpsc::Receiver<PushEvent>,
    pred: impl Fn(&PushEvent) -> bool,
) -> PushEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected event within timeout")
}

/// Test that ConnectionManager connects and forwards readings.
#[tokio::test]
async fn test_ws_connects_and_forwards_readings() {
    let server = MockWsServer::start().await;
    let (manager, mut rx) = manager(server.url());

    let handle = manager.start().await.unwrap();
    assert!(manager.status().is_connected());
    assert_eq!(server.connection_count(), 1);

    server.push_reading("r-1", "2024-03-01T12:00:00Z", 1500.0, 62.5);

    match next_matching(&mut rx, |e| matches!(e, PushEvent::Reading(_))).await {
        PushEvent::Reading(reading) => {
            assert_eq!(reading.id, "r-1");
            assert_eq!(reading.temperature, 62.5);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    manager.stop();
    handle.await.unwrap();
    assert_eq!(manager.status().state, ConnectionState::Disconnected);
    server.shutdown().await;
}

/// Malformed and invalid frames are rejected without dropping the session.
#[tokio::test]
async fn test_ws_rejects_bad_frames_and_stays_connected() {
    let server = MockWsServer::start().await;
    let (manager, mut rx) = manager(server.url());
    let handle = manager.start().await.unwrap();

    server.push("{not json");
    server.push(r#"{"event":"newReading","data":{"timestamp":"2024-03-01T12:00:00Z","speed":1,"temperature":2}}"#);
    server.push_reading("r-2", "2024-03-01T12:00:01Z", 1500.0, 60.0);

    let mut rejected = 0;
    timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await.expect("event channel closed") {
                PushEvent::Rejected { .. } => rejected += 1,
                PushEvent::Reading(reading) => {
                    assert_eq!(reading.id, "r-2");
                    break;
                }
                _ => {}
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(rejected, 2);
    assert!(manager.status().is_connected());
    assert_eq!(server.connection_count(), 1);

    manager.stop();
    handle.await.unwrap();
    server.shutdown().await;
}

/// A server-side close triggers an immediate reconnect.
#[tokio::test]
async fn test_ws_reconnects_after_server_close() {
    let server = MockWsServer::start().await;
    let (manager, _rx) = manager(server.url());
    let mut status_rx = manager.subscribe_status();
    let handle = manager.start().await.unwrap();

    server.kick_all();

    timeout(Duration::from_secs(5), async {
        while server.connection_count() < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("client should reconnect");
    timeout(
        Duration::from_secs(5),
        status_rx.wait_for(|s| s.state == ConnectionState::Connected),
    )
    .await
    .expect("status should return to connected")
    .unwrap();

    assert_eq!(server.connection_count(), 2);
    assert_eq!(manager.status().attempt_count, 0);

    manager.stop();
    handle.await.unwrap();
    server.shutdown().await;
}

/// Handshake failure returns promptly and leaves the machine disconnected.
#[tokio::test]
async fn test_ws_start_fails_without_server() {
    let (manager, _rx) = manager("ws://127.0.0.1:59999".to_string());

    let result = timeout(Duration::from_secs(5), manager.start()).await;
    assert!(result.is_ok(), "Should not hang on a refused connection");
    assert!(matches!(result.unwrap(), Err(WsError::Tungstenite(_) | WsError::ConnectionFailed(_))));
    assert_eq!(manager.status().state, ConnectionState::Disconnected);
}
