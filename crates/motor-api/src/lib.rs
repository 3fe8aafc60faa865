//! HTTP collaborators for the motor monitor.
//!
//! The ingestion core only sees the [`TelemetryApi`] trait; [`ApiClient`] is
//! the reqwest-backed implementation and [`mock::MockTelemetryApi`] the
//! scripted one used in tests.

pub mod client;
pub mod error;
pub mod mock;

pub use client::{ApiClient, ApiConfig, Snapshot, TelemetryApi};
pub use error::{ApiError, ApiResult};
