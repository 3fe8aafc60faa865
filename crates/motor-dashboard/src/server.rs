//! HTTP server implementation using axum.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use axum::Router;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use motor_core::Reading;
use motor_feed::TelemetryView;
use motor_ingest::{IngestError, OrchestratorHandle};
use motor_telemetry::Metrics;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::export::readings_to_csv;
use crate::types::{CapacityRequest, DashboardMessage, ErrorResponse};

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Reserve a slot. The slot is held until the guard is dropped.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    handle: OrchestratorHandle,
    broadcast_tx: broadcast::Sender<String>,
    connection_limiter: Arc<ConnectionLimiter>,
    config: DashboardConfig,
}

impl AppState {
    pub fn new(
        handle: OrchestratorHandle,
        broadcast_tx: broadcast::Sender<String>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            handle,
            broadcast_tx,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
        }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/view", get(get_view))
        .route("/api/alerts/{id}/ack", post(acknowledge_alert))
        .route("/api/capacity", put(set_capacity))
        .route("/api/sample", post(request_sample))
        .route("/api/export.csv", get(export_csv))
        .route("/api/export.json", get(export_json))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Current reconciled view as JSON.
async fn get_view(State(state): State<AppState>) -> Json<TelemetryView> {
    Json(state.handle.view().as_ref().clone())
}

async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, Response> {
    state
        .handle
        .acknowledge_alert(id)
        .await
        .map_err(command_error)?;
    Ok(StatusCode::ACCEPTED)
}

async fn set_capacity(
    State(state): State<AppState>,
    Json(request): Json<CapacityRequest>,
) -> Result<StatusCode, Response> {
    state
        .handle
        .set_capacity(request.max_readings)
        .await
        .map_err(command_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn request_sample(State(state): State<AppState>) -> Result<StatusCode, Response> {
    state.handle.request_sample().await.map_err(command_error)?;
    Ok(StatusCode::ACCEPTED)
}

async fn export_csv(State(state): State<AppState>) -> Response {
    let view = state.handle.view();
    match readings_to_csv(&view.readings) {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"motor-readings.csv\"",
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "CSV export failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn export_json(State(state): State<AppState>) -> Json<Vec<Reading>> {
    Json(state.handle.view().readings.clone())
}

async fn metrics() -> Response {
    match Metrics::render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn command_error(e: IngestError) -> Response {
    let status = match e {
        IngestError::InvalidCapacity(_) => StatusCode::BAD_REQUEST,
        IngestError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, e.to_string())
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let guard = match state.connection_limiter.try_acquire() {
        Some(guard) => guard,
        None => {
            warn!(
                current = state.connection_limiter.current_count(),
                max = state.config.max_connections,
                "WebSocket connection limit reached"
            );
            return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
        }
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "New WebSocket connection"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Handle a WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, state: AppState, guard: ConnectionGuard) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the view so no update falls in between
    let mut broadcast_rx = state.broadcast_tx.subscribe();

    let view = state.handle.view();
    match serde_json::to_string(&DashboardMessage::Snapshot { view: &view }) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("Failed to send initial snapshot, client disconnected");
                return;
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to serialize initial snapshot");
            return;
        }
    }

    // Incoming messages are only watched for close
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send message, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, catching up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    drop(guard);
    info!(
        connections = state.connection_limiter.current_count(),
        "WebSocket connection closed"
    );
}

/// Run the dashboard HTTP server until `shutdown` fires.
pub async fn run_server(
    handle: OrchestratorHandle,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(port = config.port, "Starting dashboard server");
    serve(listener, handle, config, shutdown).await
}

/// Serve on an already bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    handle: OrchestratorHandle,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Buffer for slow clients: 32 updates
    let (broadcast_tx, _) = broadcast::channel::<String>(32);

    let state = AppState::new(handle.clone(), broadcast_tx.clone(), config.clone());
    let app = create_router(state);

    let broadcaster = tokio::spawn(crate::broadcast::run_broadcaster(
        handle.subscribe(),
        broadcast_tx,
        config.update_interval_ms,
        shutdown.clone(),
    ));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    broadcaster.abort();
    info!("Dashboard server stopped");
    Ok(())
}
