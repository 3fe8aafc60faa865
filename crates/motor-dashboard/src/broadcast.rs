//! WebSocket broadcast functionality.
//!
//! The broadcaster samples the published view at a fixed interval and sends
//! an update to all connected WebSocket clients only when it changed. Bursts
//! of push events therefore collapse into at most one update per tick.

use std::sync::Arc;
use std::time::Duration;

use motor_feed::TelemetryView;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::types::DashboardMessage;

/// Run the broadcaster task until `shutdown` fires or the view source closes.
pub async fn run_broadcaster(
    mut views: watch::Receiver<Arc<TelemetryView>>,
    tx: broadcast::Sender<String>,
    interval_ms: u64,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        match views.has_changed() {
            Ok(true) => {}
            Ok(false) => continue,
            Err(_) => {
                debug!("View source closed, broadcaster exiting");
                break;
            }
        }

        let view = views.borrow_and_update().clone();
        match serde_json::to_string(&DashboardMessage::Update { view: &view }) {
            Ok(json) => match tx.send(json) {
                Ok(n) => {
                    trace!(receivers = n, generation = view.generation, "Broadcast update sent");
                }
                Err(_) => {
                    // No receivers - this is normal when no clients connected
                    trace!("No WebSocket receivers connected");
                }
            },
            Err(e) => {
                debug!(error = %e, "Failed to serialize dashboard update");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motor_feed::MonitorState;

    fn view(generation: u64) -> Arc<TelemetryView> {
        Arc::new(MonitorState::new(10, None, 5).view(generation))
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_only_on_change() {
        let (view_tx, view_rx) = watch::channel(view(1));
        let (tx, mut rx) = broadcast::channel::<String>(16);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_broadcaster(view_rx, tx, 100, shutdown.clone()));

        // Initial value was never marked changed
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(rx.try_recv().is_err());

        // Two publishes inside one tick collapse into one update
        view_tx.send_replace(view(2));
        view_tx.send_replace(view(3));
        tokio::time::sleep(Duration::from_millis(150)).await;

        let msg: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(msg["type"], "update");
        assert_eq!(msg["view"]["generation"], 3);
        assert!(rx.try_recv().is_err());

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_source_closes() {
        let (view_tx, view_rx) = watch::channel(view(1));
        let (tx, _rx) = broadcast::channel::<String>(16);
        let task = tokio::spawn(run_broadcaster(view_rx, tx, 100, CancellationToken::new()));

        drop(view_tx);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
