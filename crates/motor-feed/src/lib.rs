//! Telemetry reconciliation for the motor monitor.
//!
//! Pure, single-owner reducers over the in-memory state:
//! - `ReadingBuffer`: bounded, newest-first, deduplicated by id then timestamp
//! - `AlertRegistry`: deduplicated alerts with one-way acknowledgement
//! - `DerivedStats`: temperature/speed extrema with severity tiers
//! - `MonitorState`: owns all of the above and produces immutable views

pub mod advisory;
pub mod alerts;
pub mod derived;
pub mod reconciler;
pub mod state;
pub mod view;

pub use advisory::{AdvisoryLog, AdvisoryPolicy, DEFAULT_MAX_ADVISORIES};
pub use alerts::AlertRegistry;
pub use derived::{
    DerivedStats, Extremum, SpeedHighTier, SpeedLowTier, TemperatureHighTier, TemperatureLowTier,
};
pub use reconciler::{upsert, ReadingBuffer, UpsertOutcome, DEFAULT_MAX_READINGS};
pub use state::MonitorState;
pub use view::TelemetryView;
