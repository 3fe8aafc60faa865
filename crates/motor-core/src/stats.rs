//! Aggregate statistics served by the coarse-grained stats endpoint.

use serde::{Deserialize, Serialize};

/// Server-side aggregate statistics. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_readings: u64,
    pub average_speed: f64,
    pub average_temperature: f64,
    pub max_speed: f64,
    pub min_speed: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub active_alerts: u64,
}
