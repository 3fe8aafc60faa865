//! Ingestion error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Orchestrator stopped")]
    Stopped,

    #[error("Invalid capacity: {0} (must be > 0)")]
    InvalidCapacity(usize),
}

pub type IngestResult<T> = Result<T, IngestError>;
