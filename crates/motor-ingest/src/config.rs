//! Orchestrator configuration.

use motor_feed::{DEFAULT_MAX_ADVISORIES, DEFAULT_MAX_READINGS};
use motor_ws::ConnectionConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Reading buffer capacity.
    #[serde(default = "default_max_readings")]
    pub max_readings: usize,
    /// Delay before opening the push subscription.
    #[serde(default = "default_subscribe_delay_ms")]
    pub subscribe_delay_ms: u64,
    /// Push readings above this temperature raise an advisory.
    #[serde(default = "default_advisory_temperature_c")]
    pub advisory_temperature_c: f64,
    #[serde(default = "default_max_advisories")]
    pub max_advisories: usize,
    /// Alert registry bound (None = unbounded).
    #[serde(default)]
    pub max_alerts: Option<usize>,
    /// Push event channel capacity.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Retry a failed initial handshake with the reconnect backoff.
    #[serde(default = "default_retry_initial_connect")]
    pub retry_initial_connect: bool,
    /// Push channel settings, filled from the `[websocket]` section.
    #[serde(skip)]
    pub connection: ConnectionConfig,
}

fn default_max_readings() -> usize {
    DEFAULT_MAX_READINGS
}

fn default_subscribe_delay_ms() -> u64 {
    100
}

fn default_advisory_temperature_c() -> f64 {
    80.0
}

fn default_max_advisories() -> usize {
    DEFAULT_MAX_ADVISORIES
}

fn default_event_buffer() -> usize {
    1000
}

fn default_retry_initial_connect() -> bool {
    true
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_readings: default_max_readings(),
            subscribe_delay_ms: default_subscribe_delay_ms(),
            advisory_temperature_c: default_advisory_temperature_c(),
            max_advisories: default_max_advisories(),
            max_alerts: None,
            event_buffer: default_event_buffer(),
            retry_initial_connect: default_retry_initial_connect(),
            connection: ConnectionConfig::default(),
        }
    }
}

impl IngestConfig {
    pub fn subscribe_delay(&self) -> Duration {
        Duration::from_millis(self.subscribe_delay_ms)
    }
}
