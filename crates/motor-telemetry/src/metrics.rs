//! Prometheus metrics for the motor monitor.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! (e.g. a duplicate metric name) is a fatal configuration error and should
//! crash at startup. These panics only occur during static initialization.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_gauge, register_gauge_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, Gauge, GaugeVec, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};

/// Push channel connection state (1 = connected, 0 = not connected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "motor_ws_connected",
        "Push channel connection state (1=connected)"
    )
    .unwrap()
});

/// Push channel state machine current state.
/// Labels: state (disconnected/connecting/connected/reconnecting)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "motor_ws_state",
        "Push channel state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total scheduled reconnect attempts.
pub static WS_RECONNECT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "motor_ws_reconnect_total",
        "Total push channel reconnect attempts scheduled"
    )
    .unwrap()
});

/// Readings merged into the buffer.
/// Labels: outcome (inserted/replaced_by_id/replaced_by_timestamp)
pub static READINGS_INGESTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "motor_readings_ingested_total",
        "Readings merged into the buffer",
        &["outcome"]
    )
    .unwrap()
});

/// Readings evicted from the back of the buffer.
pub static READINGS_EVICTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "motor_readings_evicted_total",
        "Readings evicted by capacity"
    )
    .unwrap()
});

/// Payloads rejected at the ingestion boundary.
/// Labels: source (push/snapshot)
pub static READINGS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "motor_readings_rejected_total",
        "Payloads rejected at the ingestion boundary",
        &["source"]
    )
    .unwrap()
});

/// Current buffer length.
pub static BUFFER_LEN: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("motor_buffer_len", "Current reading buffer length").unwrap()
});

/// Alerts received.
/// Labels: outcome (added/duplicate)
pub static ALERTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("motor_alerts_total", "Alerts received", &["outcome"]).unwrap()
});

/// Locally raised high-temperature advisories.
pub static ADVISORIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "motor_advisories_total",
        "High-temperature advisories raised"
    )
    .unwrap()
});

/// HTTP collaborator calls.
/// Labels: endpoint (snapshot/stats/sample), result (ok/error)
pub static FETCH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "motor_fetch_total",
        "HTTP collaborator calls",
        &["endpoint", "result"]
    )
    .unwrap()
});

/// Orchestrator session restarts (capacity changes).
pub static ORCHESTRATOR_RESTARTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "motor_orchestrator_restarts_total",
        "Ingestion orchestrator session restarts"
    )
    .unwrap()
});

const WS_STATES: [&str; 4] = ["disconnected", "connecting", "connected", "reconnecting"];

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Set the push channel state. Only the active state is 1.
    pub fn ws_state_set(state: &str) {
        for s in WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
        WS_CONNECTED.set(if state == "connected" { 1.0 } else { 0.0 });
    }

    pub fn ws_reconnect() {
        WS_RECONNECT_TOTAL.inc();
    }

    pub fn reading_ingested(outcome: &str, evicted: usize, buffer_len: usize) {
        READINGS_INGESTED_TOTAL.with_label_values(&[outcome]).inc();
        if evicted > 0 {
            READINGS_EVICTED_TOTAL.inc_by(evicted as u64);
        }
        BUFFER_LEN.set(buffer_len as i64);
    }

    pub fn buffer_len(len: usize) {
        BUFFER_LEN.set(len as i64);
    }

    pub fn reading_rejected(source: &str, count: usize) {
        READINGS_REJECTED_TOTAL
            .with_label_values(&[source])
            .inc_by(count as u64);
    }

    pub fn alert_received(added: bool) {
        let outcome = if added { "added" } else { "duplicate" };
        ALERTS_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn advisory_raised() {
        ADVISORIES_TOTAL.inc();
    }

    pub fn fetch(endpoint: &str, ok: bool) {
        let result = if ok { "ok" } else { "error" };
        FETCH_TOTAL.with_label_values(&[endpoint, result]).inc();
    }

    pub fn orchestrator_restart() {
        ORCHESTRATOR_RESTARTS_TOTAL.inc();
    }

    /// Encode the default registry in the text exposition format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_state_is_exclusive() {
        Metrics::ws_state_set("reconnecting");
        assert_eq!(WS_STATE.with_label_values(&["reconnecting"]).get(), 1.0);
        assert_eq!(WS_STATE.with_label_values(&["connected"]).get(), 0.0);
        assert_eq!(WS_CONNECTED.get(), 0.0);

        Metrics::ws_state_set("connected");
        assert_eq!(WS_STATE.with_label_values(&["reconnecting"]).get(), 0.0);
        assert_eq!(WS_CONNECTED.get(), 1.0);
    }

    #[test]
    fn test_render_includes_counters() {
        Metrics::reading_ingested("inserted", 2, 100);
        Metrics::fetch("snapshot", false);

        let text = Metrics::render().unwrap();
        assert!(text.contains("motor_readings_ingested_total"));
        assert!(text.contains("motor_readings_evicted_total"));
        assert!(text.contains("motor_fetch_total"));
    }
}
