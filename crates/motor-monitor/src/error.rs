//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {0}")]
    Api(#[from] motor_api::ApiError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] motor_ingest::IngestError),
}

pub type AppResult<T> = Result<T, AppError>;
