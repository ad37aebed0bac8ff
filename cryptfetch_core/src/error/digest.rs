//! Digest context error types

use super::implementation::ImplementationError;
use thiserror::Error;

/// Errors raised by the digest context state machine
///
/// Each misuse has its own variant so callers never have to guess whether a
/// result was truncated or substituted.
#[derive(Error, Debug)]
pub enum DigestError {
    /// The context is not bound to any method
    #[error("Digest context is not initialized")]
    NotInitialized,

    /// The context was finalized and holds no digest state
    #[error("Digest context holds no digest state; re-initialize it first")]
    NoDigestState,

    /// The source of a copy is not initialized
    #[error("Cannot copy from an uninitialized digest context")]
    InputNotInitialized,

    /// Method has no streaming update function
    #[error("Digest '{algorithm}' does not support streaming updates")]
    UpdateUnsupported { algorithm: String },

    /// Method has no streaming final function
    #[error("Digest '{algorithm}' does not support streaming finalization")]
    FinalUnsupported { algorithm: String },

    /// Method does not accept parameters of this kind
    #[error("Digest '{algorithm}' does not accept parameters")]
    ParamsUnsupported { algorithm: String },

    /// Context initialization failed
    #[error("Failed to initialize digest '{algorithm}': {reason}")]
    InitializationFailed { algorithm: String, reason: String },

    /// Extendable output requested from a fixed-size digest, or invalid length
    #[error("Digest '{algorithm}' is not extendable or {requested} is an invalid output length")]
    NotExtendableOrInvalidLength { algorithm: String, requested: usize },

    /// Context duplication failed
    #[error("Not able to copy digest context for '{algorithm}': {reason}")]
    NotAbleToCopy { algorithm: String, reason: String },

    /// Output buffer too small for the digest
    #[error("Output buffer too small: {required} bytes required, {provided} provided")]
    BufferTooSmall { required: usize, provided: usize },

    /// Implementation callback reported a failure
    #[error("Digest '{algorithm}' implementation failed")]
    Implementation {
        algorithm: String,
        #[source]
        source: ImplementationError,
    },
}

impl DigestError {
    /// Create an update unsupported error
    pub fn update_unsupported(algorithm: &str) -> Self {
        Self::UpdateUnsupported {
            algorithm: algorithm.to_string(),
        }
    }

    /// Create a final unsupported error
    pub fn final_unsupported(algorithm: &str) -> Self {
        Self::FinalUnsupported {
            algorithm: algorithm.to_string(),
        }
    }

    /// Create a params unsupported error
    pub fn params_unsupported(algorithm: &str) -> Self {
        Self::ParamsUnsupported {
            algorithm: algorithm.to_string(),
        }
    }

    /// Create an initialization failure error
    pub fn initialization_failed(algorithm: &str, reason: impl Into<String>) -> Self {
        Self::InitializationFailed {
            algorithm: algorithm.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a not-extendable error
    pub fn not_extendable(algorithm: &str, requested: usize) -> Self {
        Self::NotExtendableOrInvalidLength {
            algorithm: algorithm.to_string(),
            requested,
        }
    }

    /// Create a copy failure error
    pub fn not_able_to_copy(algorithm: &str, reason: impl Into<String>) -> Self {
        Self::NotAbleToCopy {
            algorithm: algorithm.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a buffer too small error
    pub fn buffer_too_small(required: usize, provided: usize) -> Self {
        Self::BufferTooSmall { required, provided }
    }

    /// Wrap an implementation callback failure
    pub fn implementation(algorithm: &str, source: ImplementationError) -> Self {
        Self::Implementation {
            algorithm: algorithm.to_string(),
            source,
        }
    }
}
