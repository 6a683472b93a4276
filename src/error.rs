//! Error types for mindcast

use thiserror::Error;

/// Errors that can occur during ingestion, scoring and persistence
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse device event: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid game configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Failed to save game record: {0}")]
    Storage(String),

    #[error("No device events found in input")]
    NoEvents,
}
