//! Unified error handling for the canal-tracker library.
//!
//! Only structurally invalid input and aborted graph builds are errors.
//! Everything recoverable (bad timestamps, unknown location codes, missing
//! paths) is logged and skipped so a report can still be produced.

use thiserror::Error;

/// Unified error type for canal-tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Top-level input is not a usable collection, or violates a dataset invariant
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A segment geometry cannot be used for graph construction
    #[error("Segment '{segment_id}' has invalid geometry: {message}")]
    InvalidGeometry { segment_id: String, message: String },

    /// Graph construction was aborted through a cancellation token
    #[error("Adjacency graph construction was cancelled")]
    Cancelled,

    /// Malformed JSON handed to the ingestion layer
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation {
            message: message.into(),
        }
    }
}

/// Result type alias for canal-tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Extension trait for converting Option to TrackerError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a validation error.
    fn ok_or_validation(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_validation(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackerError::validation(message))
    }
}
