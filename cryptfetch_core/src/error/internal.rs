//! Internal library error types

use crate::method::OperationId;
use thiserror::Error;

/// Internal library errors
#[derive(Error, Debug)]
pub enum InternalError {
    /// The name or operation space can no longer produce a valid method identity
    #[error("Method identity space exhausted for '{name}' ({operation})")]
    IdentityExhausted {
        operation: OperationId,
        name: String,
    },
}

impl InternalError {
    /// Create an identity exhaustion error
    pub fn identity_exhausted(operation: OperationId, name: &str) -> Self {
        Self::IdentityExhausted {
            operation,
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_exhausted_error() {
        let error = InternalError::identity_exhausted(OperationId::DIGEST, "SHA256");
        assert!(error.to_string().contains("identity space exhausted"));
        assert!(error.to_string().contains("SHA256"));
    }
}
