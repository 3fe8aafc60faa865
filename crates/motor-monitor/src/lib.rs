//! Motor telemetry monitor.
//!
//! Wires the components together:
//! - HTTP collaborators (snapshot, aggregate stats, sample trigger)
//! - Push channel connection
//! - Ingestion orchestrator (reconciled buffer, alerts, derived metrics)
//! - Dashboard server

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
