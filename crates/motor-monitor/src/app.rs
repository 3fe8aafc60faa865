//! Main application orchestration.
//!
//! Coordinates all components:
//! - Ingestion orchestrator (snapshot, push channel, reconciled state)
//! - Dashboard server
//! - Periodic status summary
//! - Graceful shutdown

use crate::config::AppConfig;
use crate::error::AppResult;
use motor_api::{ApiClient, TelemetryApi};
use motor_ingest::{IngestionOrchestrator, OrchestratorHandle};
use motor_ws::{PushConnector, WsConnector};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Status summary interval.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Main application.
pub struct Application {
    config: AppConfig,
    orchestrator: IngestionOrchestrator,
    handle: OrchestratorHandle,
}

impl Application {
    /// Create the application with the HTTP client and WebSocket connector
    /// described by `config`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let api = ApiClient::new(config.api.clone())?;
        let connector = WsConnector::new(config.websocket.url.clone());
        Ok(Self::with_collaborators(
            config,
            Arc::new(api),
            Arc::new(connector),
        ))
    }

    /// Create the application around explicit collaborators.
    pub fn with_collaborators(
        config: AppConfig,
        api: Arc<dyn TelemetryApi>,
        connector: Arc<dyn PushConnector>,
    ) -> Self {
        let (orchestrator, handle) =
            IngestionOrchestrator::new(config.ingest_config(), api, connector);
        Self {
            config,
            orchestrator,
            handle,
        }
    }

    /// Handle to the orchestrator, valid before and during `run`.
    pub fn handle(&self) -> OrchestratorHandle {
        self.handle.clone()
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
    }

    /// Run until `shutdown` completes, then stop every component.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> AppResult<()> {
        let Self {
            config,
            orchestrator,
            handle,
        } = self;

        info!(
            api = %config.api.base_url,
            push = %config.websocket.url,
            max_readings = config.ingest.max_readings,
            "Starting application"
        );

        let mut orchestrator_task = orchestrator.spawn();
        let shutdown_token = CancellationToken::new();

        let dashboard_task = if config.dashboard.enabled {
            let handle = handle.clone();
            let dashboard_config = config.dashboard.clone();
            let token = shutdown_token.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = motor_dashboard::run_server(handle, dashboard_config, token).await
                {
                    error!(error = %e, "Dashboard server failed");
                }
            }))
        } else {
            info!("Dashboard disabled");
            None
        };

        let mut status_interval = tokio::time::interval(STATUS_INTERVAL);
        status_interval.tick().await;
        tokio::pin!(shutdown);

        info!("Entering main event loop");
        let orchestrator_alive = loop {
            tokio::select! {
                () = &mut shutdown => break true,

                _ = status_interval.tick() => log_status(&handle),

                result = &mut orchestrator_task => {
                    match result {
                        Ok(()) => warn!("Ingestion orchestrator exited unexpectedly"),
                        Err(e) => error!(error = %e, "Ingestion orchestrator task failed"),
                    }
                    break false;
                }
            }
        };

        info!("Shutting down");
        if orchestrator_alive {
            handle.stop().await?;
            if let Err(e) = orchestrator_task.await {
                warn!(error = %e, "Ingestion orchestrator task failed during shutdown");
            }
        }

        shutdown_token.cancel();
        if let Some(task) = dashboard_task {
            if let Err(e) = task.await {
                warn!(error = %e, "Dashboard task failed during shutdown");
            }
        }

        log_status(&handle);
        Ok(())
    }
}

fn log_status(handle: &OrchestratorHandle) {
    let view = handle.view();
    info!(
        generation = view.generation,
        readings = view.readings.len(),
        capacity = view.capacity,
        connection = view.connection.state.as_str(),
        attempts = view.connection.attempt_count,
        unacknowledged_alerts = view.unacknowledged_alerts(),
        advisories = view.advisories.len(),
        "Status summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use motor_api::mock::MockTelemetryApi;
    use motor_ws::mock::MockConnector;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.dashboard.enabled = false;
        config.websocket.url = "ws://mock".to_string();
        config
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = config();
        config.ingest.max_readings = 0;
        assert!(Application::new(config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_stops_orchestrator() {
        let connector = Arc::new(MockConnector::new());
        let session = connector.push_session();
        let api = Arc::new(MockTelemetryApi::new());
        api.set_snapshot(vec![]);

        let app = Application::with_collaborators(config(), api, connector.clone());
        let handle = app.handle();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(app.run_until(async {
            let _ = stop_rx.await;
        }));

        let mut views = handle.subscribe();
        views.wait_for(|v| v.connected).await.unwrap();

        stop_tx.send(()).unwrap();
        task.await.unwrap().unwrap();

        assert!(!handle.view().connected);
        assert!(session.is_closed());
        assert!(handle.request_sample().await.is_err());
    }
}
