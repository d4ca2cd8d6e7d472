//! Core error types for linkmend-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Only document
//! shape problems are errors here; inconsistent linking is data, not failure.

use thiserror::Error;

/// Errors produced while reading or writing a graph document.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The input parsed as JSON but does not have the shape of a graph document.
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    /// JSON parsing or serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CoreError::MalformedInput {
            reason: reason.into(),
        }
    }
}
