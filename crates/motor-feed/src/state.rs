//! Single-owner monitor state.
//!
//! Every buffer mutation recomputes `DerivedStats` before returning, so a
//! view never pairs extrema with a buffer they were not computed from.

use crate::advisory::AdvisoryLog;
use crate::alerts::AlertRegistry;
use crate::derived::DerivedStats;
use crate::reconciler::{ReadingBuffer, UpsertOutcome};
use crate::view::TelemetryView;
use chrono::{DateTime, Utc};
use motor_core::{Advisory, Alert, DashboardStats, Reading};
use motor_ws::ConnectionStatus;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct MonitorState {
    buffer: ReadingBuffer,
    alerts: AlertRegistry,
    advisories: AdvisoryLog,
    derived: DerivedStats,
    connection: ConnectionStatus,
    loading: bool,
    stats: Option<DashboardStats>,
    updated_at: DateTime<Utc>,
}

impl MonitorState {
    /// Fresh state: empty buffer and registry, loading until the snapshot
    /// settles.
    pub fn new(capacity: usize, max_alerts: Option<usize>, max_advisories: usize) -> Self {
        Self {
            buffer: ReadingBuffer::new(capacity),
            alerts: AlertRegistry::with_capacity(max_alerts),
            advisories: AdvisoryLog::new(max_advisories),
            derived: DerivedStats::default(),
            connection: ConnectionStatus::default(),
            loading: true,
            stats: None,
            updated_at: Utc::now(),
        }
    }

    pub fn buffer(&self) -> &ReadingBuffer {
        &self.buffer
    }

    pub fn alerts(&self) -> &AlertRegistry {
        &self.alerts
    }

    pub fn advisories(&self) -> &AdvisoryLog {
        &self.advisories
    }

    pub fn derived(&self) -> &DerivedStats {
        &self.derived
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn stats(&self) -> Option<&DashboardStats> {
        self.stats.as_ref()
    }

    pub fn ingest_reading(&mut self, reading: Reading) -> UpsertOutcome {
        let outcome = self.buffer.upsert(reading);
        trace!(outcome = outcome.as_str(), len = self.buffer.len(), "Reading merged");
        self.recompute();
        outcome
    }

    /// Merge the snapshot and clear the loading flag.
    pub fn merge_snapshot(&mut self, snapshot: Vec<Reading>) -> usize {
        let len = self.buffer.merge_snapshot(snapshot);
        self.loading = false;
        self.recompute();
        len
    }

    /// Snapshot fetch failed: keep what is there, clear the loading flag.
    pub fn snapshot_failed(&mut self) {
        self.loading = false;
        self.touch();
    }

    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        let evicted = self.buffer.set_capacity(capacity);
        self.recompute();
        evicted
    }

    pub fn add_alert(&mut self, alert: Alert) -> bool {
        let added = self.alerts.add(alert);
        if added {
            self.touch();
        }
        added
    }

    pub fn acknowledge(&mut self, id: &str) -> bool {
        let changed = self.alerts.acknowledge(id);
        if changed {
            self.touch();
        }
        changed
    }

    pub fn record_advisory(&mut self, advisory: Advisory) {
        self.advisories.push(advisory);
        self.touch();
    }

    /// Returns true if the status changed.
    pub fn set_connection(&mut self, status: ConnectionStatus) -> bool {
        if self.connection == status {
            return false;
        }
        self.connection = status;
        self.touch();
        true
    }

    pub fn set_stats(&mut self, stats: DashboardStats) {
        self.stats = Some(stats);
        self.touch();
    }

    pub fn view(&self, generation: u64) -> TelemetryView {
        TelemetryView {
            generation,
            capacity: self.buffer.capacity(),
            readings: self.buffer.to_vec(),
            alerts: self.alerts.to_vec(),
            advisories: self.advisories.to_vec(),
            derived: self.derived.clone(),
            connection: self.connection,
            connected: self.connection.is_connected(),
            loading: self.loading,
            stats: self.stats.clone(),
            updated_at: self.updated_at,
        }
    }

    fn recompute(&mut self) {
        self.derived = DerivedStats::compute(self.buffer.iter());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use motor_ws::ConnectionState;

    fn reading(id: &str, secs: i64, temperature: f64) -> Reading {
        Reading::new(id, Utc.timestamp_opt(secs, 0).unwrap(), 1500.0, temperature)
    }

    #[test]
    fn test_new_state_is_loading_and_empty() {
        let state = MonitorState::new(100, None, 20);
        let view = state.view(1);
        assert!(view.loading);
        assert!(view.readings.is_empty());
        assert!(view.derived.is_empty());
        assert!(!view.connected);
        assert_eq!(view.capacity, 100);
        assert_eq!(view.generation, 1);
    }

    #[test]
    fn test_derived_tracks_eviction() {
        let mut state = MonitorState::new(2, None, 20);
        state.ingest_reading(reading("hot", 1, 95.0));
        state.ingest_reading(reading("b", 2, 50.0));
        assert_eq!(state.derived().max_temp.as_ref().unwrap().reading.id, "hot");

        // Evicts "hot"
        state.ingest_reading(reading("c", 3, 60.0));
        assert_eq!(state.derived().max_temp.as_ref().unwrap().reading.id, "c");
        assert_eq!(state.derived().min_temp.as_ref().unwrap().reading.id, "b");
    }

    #[test]
    fn test_snapshot_clears_loading() {
        let mut state = MonitorState::new(10, None, 20);
        state.merge_snapshot(vec![reading("a", 1, 40.0)]);
        assert!(!state.is_loading());
        assert_eq!(state.buffer().len(), 1);

        let mut failed = MonitorState::new(10, None, 20);
        failed.snapshot_failed();
        assert!(!failed.is_loading());
        assert!(failed.buffer().is_empty());
    }

    #[test]
    fn test_set_capacity_recomputes() {
        let mut state = MonitorState::new(10, None, 20);
        state.ingest_reading(reading("old-hot", 1, 99.0));
        state.ingest_reading(reading("new", 2, 40.0));

        assert_eq!(state.set_capacity(1), 1);
        assert_eq!(state.derived().max_temp.as_ref().unwrap().reading.id, "new");
    }

    #[test]
    fn test_connection_signal() {
        let mut state = MonitorState::new(10, None, 20);
        let reconnecting = ConnectionStatus {
            state: ConnectionState::Reconnecting,
            attempt_count: 1,
        };
        assert!(state.set_connection(reconnecting));
        assert!(!state.set_connection(reconnecting));
        assert!(!state.view(0).connected);

        state.set_connection(ConnectionStatus {
            state: ConnectionState::Connected,
            attempt_count: 0,
        });
        assert!(state.view(0).connected);
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let mut state = MonitorState::new(10, None, 20);
        state.ingest_reading(reading("a", 1, 40.0));
        let json = serde_json::to_value(state.view(3)).unwrap();

        assert_eq!(json["generation"], 3);
        assert_eq!(json["readings"][0]["id"], "a");
        assert_eq!(json["derived"]["maxTemp"]["reading"]["id"], "a");
        assert_eq!(json["derived"]["minSpeed"]["tier"], "normal");
        assert_eq!(json["connection"]["state"], "disconnected");
    }
}
