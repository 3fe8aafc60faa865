//! Core domain types for the motor telemetry monitor.
//!
//! This crate provides the types shared by every other crate:
//! - `Reading`: one timestamped sensor sample from the monitored motor
//! - `SensorChannels`: the optional secondary sensor fields of a reading
//! - `Alert`: a server-pushed alert with one-way acknowledgement
//! - `Advisory`: a locally synthesized over-temperature notice
//! - `DashboardStats`: aggregate statistics from the stats endpoint
//!
//! Wire payloads arrive as `RawReading` / `RawAlert` and are validated into
//! their domain counterparts at the ingestion boundary.

pub mod alert;
pub mod error;
pub mod reading;
pub mod stats;

pub use alert::{Advisory, Alert, RawAlert};
pub use error::{CoreError, Result};
pub use reading::{RawReading, Reading, ReadingStatus, SensorChannels, SENSOR_CHANNEL_NAMES};
pub use stats::DashboardStats;
