//! Immutable view published to the rendering layer.

use crate::derived::DerivedStats;
use chrono::{DateTime, Utc};
use motor_core::{Advisory, Alert, DashboardStats, Reading};
use motor_ws::ConnectionStatus;
use serde::Serialize;

/// Point-in-time copy of the reconciled state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryView {
    /// Orchestrator session that produced this view.
    pub generation: u64,
    pub capacity: usize,
    /// Newest-first.
    pub readings: Vec<Reading>,
    /// Newest-first.
    pub alerts: Vec<Alert>,
    pub advisories: Vec<Advisory>,
    pub derived: DerivedStats,
    pub connection: ConnectionStatus,
    /// Display signal: true only while `Connected`.
    pub connected: bool,
    pub loading: bool,
    pub stats: Option<DashboardStats>,
    pub updated_at: DateTime<Utc>,
}

impl TelemetryView {
    pub fn unacknowledged_alerts(&self) -> usize {
        self.alerts.iter().filter(|a| !a.acknowledged).count()
    }
}
