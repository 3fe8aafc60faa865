//! Ingestion orchestrator for the motor monitor.
//!
//! Owns the reconciled state for one session at a time: fetches the
//! snapshot, opens the push subscription after a short delay, feeds every
//! event through the reducers and publishes immutable views on a watch
//! channel. Callers interact through an [`OrchestratorHandle`].

pub mod config;
pub mod error;
pub mod handle;
pub mod orchestrator;

pub use config::IngestConfig;
pub use error::{IngestError, IngestResult};
pub use handle::OrchestratorHandle;
pub use orchestrator::IngestionOrchestrator;
