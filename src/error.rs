//! Domain-specific error types for feedback-triage

use thiserror::Error;

/// Main error type for the feedback triage pipeline.
///
/// Only `Validation` is expected to surface to callers of the analysis
/// path; the AI-dependent variants (`ModelUnavailable`, `Agent`,
/// `MalformedResponse`, `Timeout`) are absorbed by their components,
/// which degrade to tagged deterministic fallback values instead.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Sentiment model unavailable: {message}")]
    ModelUnavailable { message: String },

    #[error("Agent error: {message}")]
    Agent { message: String },

    #[error("Malformed agent response: {message}")]
    MalformedResponse { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl From<serde_json::Error> for TriageError {
    fn from(err: serde_json::Error) -> Self {
        TriageError::MalformedResponse {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for TriageError {
    fn from(err: rusqlite::Error) -> Self {
        TriageError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for TriageError {
    fn from(err: csv::Error) -> Self {
        TriageError::Validation {
            message: format!("CSV parsing error: {}", err),
        }
    }
}

/// Result type alias for triage operations
pub type Result<T> = std::result::Result<T, TriageError>;
