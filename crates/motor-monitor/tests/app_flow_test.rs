//! End-to-end flow through the application.
//!
//! Real WebSocket transport, scripted HTTP collaborators:
//! - Snapshot seeds the view, pushed readings are reconciled into it
//! - Alerts and acknowledgement
//! - Reconnect after a server-side drop
//! - Shutdown releases the push subscription

mod integration;
use integration::common::mock_ws::MockWsServer;

use chrono::{TimeZone, Utc};
use motor_api::mock::MockTelemetryApi;
use motor_core::Reading;
use motor_feed::TelemetryView;
use motor_ingest::OrchestratorHandle;
use motor_monitor::{AppConfig, Application};
use motor_ws::{ConnectionState, WsConnector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

struct Running {
    handle: OrchestratorHandle,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<motor_monitor::AppResult<()>>,
}

fn start(server: &MockWsServer, api: MockTelemetryApi) -> Running {
    let mut config = AppConfig::default();
    config.dashboard.enabled = false;
    config.websocket.url = server.url();
    config.ingest.subscribe_delay_ms = 10;

    let app = Application::with_collaborators(
        config,
        Arc::new(api),
        Arc::new(WsConnector::new(server.url())),
    );
    let handle = app.handle();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(app.run_until(async {
        let _ = stop_rx.await;
    }));

    Running {
        handle,
        stop_tx,
        task,
    }
}

async fn wait_for(
    handle: &OrchestratorHandle,
    pred: impl FnMut(&Arc<TelemetryView>) -> bool,
) -> Arc<TelemetryView> {
    let mut views = handle.subscribe();
    let view = timeout(Duration::from_secs(5), views.wait_for(pred))
        .await
        .expect("condition not reached within timeout")
        .expect("orchestrator stopped");
    Arc::clone(&view)
}

async fn shutdown(running: Running, server: MockWsServer) {
    running.stop_tx.send(()).unwrap();
    timeout(Duration::from_secs(5), running.task)
        .await
        .expect("shutdown within timeout")
        .unwrap()
        .unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn test_snapshot_and_push_are_reconciled() {
    let server = MockWsServer::start().await;
    let api = MockTelemetryApi::new();
    api.set_snapshot(vec![
        Reading::new(
            "r-1",
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            1500.0,
            60.0,
        ),
        Reading::new(
            "r-2",
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 1).unwrap(),
            1510.0,
            61.0,
        ),
    ]);
    let running = start(&server, api);

    wait_for(&running.handle, |v| !v.loading && v.connected).await;

    // Resend of r-2 updates in place; r-3 is new; r-4 is hot
    server.push_reading("r-2", "2024-03-01T12:00:01Z", 1520.0, 63.0);
    server.push_reading("r-3", "2024-03-01T12:00:02Z", 1530.0, 64.0);
    server.push_reading("r-4", "2024-03-01T12:00:03Z", 1540.0, 88.0);

    let view = wait_for(&running.handle, |v| v.readings.len() == 4).await;
    let ids: Vec<&str> = view.readings.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r-4", "r-3", "r-2", "r-1"]);
    assert_eq!(view.readings[2].temperature, 63.0);
    assert_eq!(view.advisories.len(), 1);
    assert_eq!(view.derived.max_temp.as_ref().unwrap().reading.id, "r-4");

    shutdown(running, server).await;
}

#[tokio::test]
async fn test_alert_acknowledgement() {
    let server = MockWsServer::start().await;
    let api = MockTelemetryApi::new();
    api.set_snapshot(vec![]);
    let running = start(&server, api);

    wait_for(&running.handle, |v| v.connected).await;
    server.push(r#"{"event":"newAlert","data":{"id":"a-1","message":"Bearing wear"}}"#);
    wait_for(&running.handle, |v| v.alerts.len() == 1).await;

    running.handle.acknowledge_alert("a-1").await.unwrap();
    let view = wait_for(&running.handle, |v| v.unacknowledged_alerts() == 0).await;
    assert!(view.alerts[0].acknowledged);

    // A resend never clears the acknowledgement
    server.push(r#"{"event":"newAlert","data":{"id":"a-1","message":"Bearing wear"}}"#);
    server.push_reading("marker", "2024-03-01T12:00:00Z", 1500.0, 50.0);
    let view = wait_for(&running.handle, |v| v.readings.len() == 1).await;
    assert_eq!(view.alerts.len(), 1);
    assert!(view.alerts[0].acknowledged);

    shutdown(running, server).await;
}

#[tokio::test]
async fn test_reconnect_keeps_buffer() {
    let server = MockWsServer::start().await;
    let api = MockTelemetryApi::new();
    api.set_snapshot(vec![]);
    let running = start(&server, api);

    wait_for(&running.handle, |v| v.connected).await;
    server.push_reading("r-1", "2024-03-01T12:00:00Z", 1500.0, 50.0);
    wait_for(&running.handle, |v| v.readings.len() == 1).await;

    server.kick_all();
    timeout(Duration::from_secs(5), async {
        while server.connection_count() < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("client should reconnect");

    let view = wait_for(&running.handle, |v| v.connected).await;
    assert_eq!(view.readings.len(), 1);
    assert_eq!(view.generation, 1);

    server.push_reading("r-2", "2024-03-01T12:00:01Z", 1500.0, 51.0);
    wait_for(&running.handle, |v| v.readings.len() == 2).await;

    shutdown(running, server).await;
}

#[tokio::test]
async fn test_shutdown_disconnects() {
    let server = MockWsServer::start().await;
    let api = MockTelemetryApi::new();
    let running = start(&server, api);
    let handle = running.handle.clone();

    wait_for(&handle, |v| v.connected && !v.loading).await;
    shutdown(running, server).await;

    let view = handle.view();
    assert!(!view.connected);
    assert_eq!(view.connection.state, ConnectionState::Disconnected);
    assert!(handle.acknowledge_alert("a-1").await.is_err());
}
