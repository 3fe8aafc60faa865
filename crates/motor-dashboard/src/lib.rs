//! motor-dashboard - HTTP/WebSocket surface for the motor monitor.
//!
//! Publishes the reconciled [`TelemetryView`](motor_feed::TelemetryView) to
//! the rendering layer and forwards its commands to the orchestrator:
//!
//! ```text
//!   GET  /api/view            current view (JSON)
//!   GET  /ws                  snapshot on connect, then throttled updates
//!   POST /api/alerts/{id}/ack acknowledge an alert
//!   PUT  /api/capacity        {"max_readings": n}, restarts the session
//!   POST /api/sample          ask the backend for one reading
//!   GET  /api/export.csv      buffer as CSV (35 columns)
//!   GET  /api/export.json     buffer as JSON
//!   GET  /metrics             Prometheus text format
//! ```

mod broadcast;
mod config;
mod export;
mod server;
mod types;

pub use config::DashboardConfig;
pub use export::{readings_to_csv, CSV_COLUMNS};
pub use server::{create_router, run_server, serve, AppState, ConnectionGuard, ConnectionLimiter};
pub use types::{CapacityRequest, DashboardMessage, ErrorResponse};
