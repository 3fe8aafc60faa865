//! Error types for motor-core.

use thiserror::Error;

/// Core error types.
///
/// Every variant is a data-quality error raised at the ingestion boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("{kind} rejected: missing identity key")]
    MissingIdentity { kind: &'static str },

    #[error("Reading {id} rejected: missing timestamp")]
    MissingTimestamp { id: String },

    #[error("Reading {id} rejected: {field} is not finite")]
    NonFinite { id: String, field: &'static str },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
