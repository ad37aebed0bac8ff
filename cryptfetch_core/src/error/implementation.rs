//! Errors reported by provider and legacy implementation callbacks

use thiserror::Error;

/// Failure reported by an algorithm implementation callback
///
/// Providers only know about their own state, so the error carries a plain
/// message; the digest context adds the algorithm name when it wraps it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ImplementationError {
    message: String,
}

impl ImplementationError {
    /// Create an implementation error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The provider context handed to a callback was not the expected type
    pub fn context_mismatch(expected: &str) -> Self {
        Self::new(format!("provider context is not a {expected} state"))
    }

    /// The output buffer handed to a callback is too short
    pub fn output_too_small(required: usize, provided: usize) -> Self {
        Self::new(format!(
            "output buffer holds {provided} bytes but {required} are required"
        ))
    }

    /// Message describing the failure
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for implementation callbacks
pub type ImplResult<T> = std::result::Result<T, ImplementationError>;
