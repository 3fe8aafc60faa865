//! Push-channel connection manager.
//!
//! Drives the [`ConnectionStateMachine`] from transport outcomes, supervises
//! an established session, and reconnects after drops using the backoff
//! schedule. Every pending timer and handshake is raced against a
//! cancellation token so that `stop()` is final.
//!
//! Status is published on a `watch` channel, separate from the bounded
//! event channel, so a full event queue never hides a state change.

use crate::backoff::BackoffPolicy;
use crate::connector::{PushConnector, PushStream};
use crate::error::{WsError, WsResult};
use crate::message::{self, PushEvent};
use crate::state::{ConnectionState, ConnectionStateMachine, ConnectionStatus};
use futures_util::StreamExt;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 30000,
        }
    }
}

impl ConnectionConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.reconnect_base_delay_ms, self.reconnect_max_delay_ms)
    }
}

/// Why a session pump returned.
enum PumpExit {
    Shutdown,
    Dropped(WsError),
}

/// Push-channel connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    connector: Arc<dyn PushConnector>,
    machine: RwLock<ConnectionStateMachine>,
    event_tx: mpsc::Sender<PushEvent>,
    /// Latest status; readers only ever need the current value.
    status_tx: watch::Sender<ConnectionStatus>,
    /// Cancellation token for stop.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    pub fn new(
        config: ConnectionConfig,
        connector: Arc<dyn PushConnector>,
        event_tx: mpsc::Sender<PushEvent>,
    ) -> Self {
        Self::with_token(config, connector, event_tx, CancellationToken::new())
    }

    /// Create a manager whose lifetime is bounded by `shutdown_token`.
    pub fn with_token(
        config: ConnectionConfig,
        connector: Arc<dyn PushConnector>,
        event_tx: mpsc::Sender<PushEvent>,
        shutdown_token: CancellationToken,
    ) -> Self {
        let machine = ConnectionStateMachine::new(config.backoff(), config.max_reconnect_attempts);
        let (status_tx, _) = watch::channel(machine.status());
        Self {
            config,
            connector,
            machine: RwLock::new(machine),
            event_tx,
            status_tx,
            shutdown_token,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn status(&self) -> ConnectionStatus {
        self.machine.read().status()
    }

    /// Subscribe to status changes. Intermediate states may be coalesced;
    /// the receiver always converges on the current status.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Perform the handshake.
    ///
    /// Returns once the outcome is known: on success the session is
    /// supervised by a spawned task whose handle is returned; on failure the
    /// machine is back in `Disconnected` and the caller decides whether to
    /// retry.
    pub async fn start(self: &Arc<Self>) -> WsResult<JoinHandle<()>> {
        self.transition(|m| m.begin_connect())?;

        let outcome = tokio::select! {
            biased;
            () = self.shutdown_token.cancelled() => {
                info!("Stop requested during handshake");
                return Err(WsError::Shutdown);
            }
            result = self.connector.connect() => result,
        };

        match outcome {
            Ok(stream) => {
                self.transition(|m| m.on_connected())?;
                info!(url = %self.config.url, "Push channel connected");
                let manager = Arc::clone(self);
                Ok(tokio::spawn(async move { manager.supervise(stream).await }))
            }
            Err(e) => {
                warn!(error = %e, "Push channel connect failed");
                self.transition(|m| m.on_connect_failed())?;
                Err(e)
            }
        }
    }

    /// Release the subscription and move to `Disconnected`.
    ///
    /// Idempotent. Pending reconnect timers and handshakes observe the
    /// cancellation and exit without further transitions.
    pub fn stop(&self) {
        self.shutdown_token.cancel();
        let previous = {
            let mut machine = self.machine.write();
            let previous = machine.stop();
            if previous != ConnectionState::Disconnected {
                self.status_tx.send_replace(machine.status());
            }
            previous
        };
        if previous != ConnectionState::Disconnected {
            info!(?previous, "Push channel stopped");
        }
    }

    async fn supervise(self: Arc<Self>, mut stream: PushStream) {
        loop {
            let reason = match self.pump(&mut stream).await {
                PumpExit::Shutdown => return,
                PumpExit::Dropped(reason) => reason,
            };
            warn!(%reason, "Push channel dropped");

            let Some(next) = self.reconnect(|m| m.on_dropped()).await else {
                return;
            };
            stream = next;
        }
    }

    /// Run the reconnect schedule until a session is re-established.
    ///
    /// Returns `None` on stop or exhaustion.
    async fn reconnect(
        &self,
        first: impl FnOnce(&mut ConnectionStateMachine) -> WsResult<Option<Duration>>,
    ) -> Option<PushStream> {
        let mut scheduled = self.transition(first);

        loop {
            let delay = match scheduled {
                Ok(Some(delay)) => delay,
                Ok(None) => {
                    error!("Max reconnection attempts reached");
                    return None;
                }
                Err(WsError::Shutdown) => return None,
                Err(e) => {
                    error!(error = %e, "Reconnect scheduling failed");
                    return None;
                }
            };

            let status = self.status();
            warn!(
                attempt = status.attempt_count,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting"
            );

            // Wait for delay OR stop (cancellation-aware sleep)
            tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => {
                    info!("Stop requested during backoff, exiting");
                    return None;
                }
                () = tokio::time::sleep(delay) => {}
            }

            let outcome = tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => {
                    info!("Stop requested during reconnect handshake, exiting");
                    return None;
                }
                result = self.connector.connect() => result,
            };

            match outcome {
                Ok(stream) => {
                    if self.transition(|m| m.on_connected()).is_err() {
                        return None;
                    }
                    info!("Push channel reconnected");
                    return Some(stream);
                }
                Err(e) => {
                    warn!(error = %e, "Reconnect attempt failed");
                    scheduled = self.transition(|m| m.on_reconnect_failed());
                }
            }
        }
    }

    async fn pump(&self, stream: &mut PushStream) -> PumpExit {
        loop {
            let frame = tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => return PumpExit::Shutdown,
                frame = stream.next() => frame,
            };

            match frame {
                Some(Ok(text)) => {
                    if !self.handle_text(&text).await {
                        return PumpExit::Shutdown;
                    }
                }
                Some(Err(e)) => return PumpExit::Dropped(e),
                None => {
                    return PumpExit::Dropped(WsError::ConnectionClosed {
                        code: 1006,
                        reason: "Stream ended".to_string(),
                    })
                }
            }
        }
    }

    /// Decode one frame and forward it. Returns false when the manager
    /// should stop pumping.
    async fn handle_text(&self, text: &str) -> bool {
        let event = match message::decode(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping push frame");
                PushEvent::Rejected {
                    reason: e.to_string(),
                }
            }
        };

        if let PushEvent::Reading(reading) = &event {
            debug!(reading_id = %reading.id, "Push reading received");
        }

        tokio::select! {
            biased;
            () = self.shutdown_token.cancelled() => false,
            sent = self.event_tx.send(event) => {
                if sent.is_err() {
                    warn!("Event receiver dropped");
                    return false;
                }
                true
            }
        }
    }

    /// Apply a transition unless stop has been requested, and publish the
    /// resulting status under the same lock so `stop()` cannot be overtaken.
    fn transition<T>(
        &self,
        f: impl FnOnce(&mut ConnectionStateMachine) -> WsResult<T>,
    ) -> WsResult<T> {
        let (result, status) = {
            let mut machine = self.machine.write();
            if self.shutdown_token.is_cancelled() {
                return Err(WsError::Shutdown);
            }
            let result = f(&mut machine)?;
            let status = machine.status();
            self.status_tx.send_replace(status);
            (result, status)
        };
        debug!(
            state = status.state.as_str(),
            attempt = status.attempt_count,
            "Push channel state changed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockConnector;
    use chrono::{TimeZone, Utc};
    use motor_core::Reading;

    fn config(max_reconnect_attempts: u32) -> ConnectionConfig {
        ConnectionConfig {
            url: "ws://mock".to_string(),
            max_reconnect_attempts,
            ..Default::default()
        }
    }

    fn manager(
        connector: &Arc<MockConnector>,
        max_reconnect_attempts: u32,
    ) -> (Arc<ConnectionManager>, mpsc::Receiver<PushEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let manager = ConnectionManager::new(
            config(max_reconnect_attempts),
            Arc::clone(connector) as Arc<dyn PushConnector>,
            tx,
        );
        (Arc::new(manager), rx)
    }

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_reconnect_attempts, 0); // Infinite
        assert_eq!(config.backoff(), BackoffPolicy::default());
    }

    #[tokio::test]
    async fn test_start_success_forwards_readings() {
        let connector = Arc::new(MockConnector::new());
        let session = connector.push_session();
        let (manager, mut rx) = manager(&connector, 0);

        let handle = manager.start().await.unwrap();
        assert!(manager.status().is_connected());

        let reading = Reading::new("r-1", Utc.timestamp_opt(100, 0).unwrap(), 1200.0, 55.0);
        session.send_reading(&reading);

        loop {
            match rx.recv().await.unwrap() {
                PushEvent::Reading(received) => {
                    assert_eq!(received, reading);
                    break;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }

        manager.stop();
        handle.await.unwrap();
        assert_eq!(manager.status().state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_bad_frame_does_not_drop_connection() {
        let connector = Arc::new(MockConnector::new());
        let session = connector.push_session();
        let (manager, mut rx) = manager(&connector, 0);
        let handle = manager.start().await.unwrap();

        session.send_text("not json");
        session.send_text(r#"{"event":"newAlert","data":{"id":"a-1","message":"hot"}}"#);

        let mut rejected = 0;
        loop {
            match rx.recv().await.unwrap() {
                PushEvent::Rejected { .. } => rejected += 1,
                PushEvent::Alert(alert) => {
                    assert_eq!(alert.id, "a-1");
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(rejected, 1);
        assert!(manager.status().is_connected());
        assert_eq!(connector.attempts(), 1);

        manager.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_start_failure_returns_to_disconnected() {
        let connector = Arc::new(MockConnector::new());
        connector.push_refusal();
        let (manager, _rx) = manager(&connector, 0);
        let mut status_rx = manager.subscribe_status();

        assert!(manager.start().await.is_err());
        assert_eq!(manager.status().state, ConnectionState::Disconnected);
        assert!(status_rx.has_changed().unwrap());
        assert_eq!(*status_rx.borrow_and_update(), ConnectionStatus::default());
    }

    #[tokio::test]
    async fn test_status_survives_full_event_queue() {
        let connector = Arc::new(MockConnector::new());
        let session = connector.push_session();
        let (tx, _rx) = mpsc::channel(1);
        let manager = Arc::new(ConnectionManager::new(
            config(0),
            Arc::clone(&connector) as Arc<dyn PushConnector>,
            tx,
        ));
        let status_rx = manager.subscribe_status();

        let handle = manager.start().await.unwrap();
        // Nobody drains the event queue.
        session.send_text("not json");
        session.send_text("not json either");
        tokio::task::yield_now().await;

        assert!(status_rx.borrow().is_connected());
        assert_eq!(status_rx.borrow().attempt_count, 0);

        manager.stop();
        handle.await.unwrap();
        assert_eq!(*status_rx.borrow(), ConnectionStatus::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_drop() {
        let connector = Arc::new(MockConnector::new());
        let first = connector.push_session();
        connector.push_refusal();
        let _second = connector.push_session();
        let (manager, _rx) = manager(&connector, 0);
        let status_rx = manager.subscribe_status();

        let handle = manager.start().await.unwrap();
        drop(first);

        // Attempt 0 is immediate and refused; attempt 1 waits 2s.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(connector.attempts(), 2);
        assert_eq!(manager.status().state, ConnectionState::Reconnecting);
        assert_eq!(manager.status().attempt_count, 2);
        assert_eq!(status_rx.borrow().state, ConnectionState::Reconnecting);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(connector.attempts(), 3);
        assert!(manager.status().is_connected());
        assert_eq!(manager.status().attempt_count, 0);
        assert_eq!(*status_rx.borrow(), manager.status());

        manager.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_reconnect() {
        let connector = Arc::new(MockConnector::new());
        let first = connector.push_session();
        connector.push_refusal();
        let (manager, _rx) = manager(&connector, 0);
        let mut status_rx = manager.subscribe_status();

        let handle = manager.start().await.unwrap();
        drop(first);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(connector.attempts(), 2);

        // A 2s reconnect timer is pending.
        manager.stop();
        handle.await.unwrap();
        assert_eq!(*status_rx.borrow_and_update(), ConnectionStatus::default());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.attempts(), 2);
        assert_eq!(manager.status().state, ConnectionState::Disconnected);
        assert!(!status_rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_exhaustion() {
        let connector = Arc::new(MockConnector::new());
        let first = connector.push_session();
        connector.push_refusal();
        connector.push_refusal();
        let (manager, _rx) = manager(&connector, 2);

        let handle = manager.start().await.unwrap();
        drop(first);

        handle.await.unwrap();
        assert_eq!(connector.attempts(), 3);
        assert_eq!(manager.status().state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let connector = Arc::new(MockConnector::new());
        let (manager, _rx) = manager(&connector, 0);
        manager.stop();
        manager.stop();
        assert_eq!(manager.status().state, ConnectionState::Disconnected);
        assert!(matches!(manager.start().await, Err(WsError::Shutdown)));
        assert_eq!(connector.attempts(), 0);
    }
}
