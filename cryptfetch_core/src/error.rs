//! Error types for the cryptfetch core library
//!
//! Errors are organized into logical categories that mirror how callers are
//! expected to react to them: "not available" fetch results, digest context
//! misuse, malformed input, and internal resource problems.

use thiserror::Error;

pub mod digest;
pub mod fetch;
pub mod implementation;
pub mod internal;
pub mod validation;

pub use self::digest::DigestError;
pub use self::fetch::FetchError;
pub use self::implementation::ImplementationError;
pub use self::validation::ValidationError;
pub use internal::InternalError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the cryptfetch core library
///
/// Errors are categorized into these main types:
/// - Fetch errors: algorithm resolution outcomes (unsupported algorithm, provider loading)
/// - Digest errors: digest context misuse and implementation failures
/// - Validation errors: property strings, parameters and configuration
/// - Internal errors: identity space exhaustion
/// - Implementation errors: failures reported by provider callbacks
#[derive(Error, Debug)]
pub enum Error {
    /// Algorithm resolution errors
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Digest context errors
    #[error(transparent)]
    Digest(#[from] DigestError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal library errors
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// A non-digest implementation callback failed
    #[error("Algorithm '{algorithm}' implementation failed")]
    Implementation {
        algorithm: String,
        #[source]
        source: ImplementationError,
    },
}

impl Error {
    /// Wrap a failure reported by an implementation callback
    pub fn implementation(algorithm: &str, source: ImplementationError) -> Self {
        Self::Implementation {
            algorithm: algorithm.to_string(),
            source,
        }
    }

    /// Whether this error only reports that an algorithm is not available.
    ///
    /// Callers typically answer this with a fallback (for example a legacy
    /// built-in) or by reporting the algorithm name as unsupported.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Fetch(FetchError::Unsupported { .. }))
    }
}

// Conversions from external error types

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Validation(ValidationError::invalid_configuration(&err.to_string()))
    }
}
