//! Dashboard API types.
//!
//! These types are used for JSON serialization in REST and WebSocket APIs.

use motor_feed::TelemetryView;
use serde::{Deserialize, Serialize};

/// WebSocket message pushed to the rendering layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage<'a> {
    /// Full view, sent once on connect.
    Snapshot { view: &'a TelemetryView },
    /// Full view, sent when it changed since the last update.
    Update { view: &'a TelemetryView },
}

/// Body of `PUT /api/capacity`.
#[derive(Debug, Clone, Deserialize)]
pub struct CapacityRequest {
    pub max_readings: usize,
}

/// Error body returned by command endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
