//! Algorithm resolution error types

use crate::method::OperationId;
use thiserror::Error;

/// Outcomes of algorithm resolution that are not internal failures
#[derive(Error, Debug)]
pub enum FetchError {
    /// No loaded provider offers a matching implementation
    #[error("Unsupported algorithm '{name}' for {operation} operation")]
    Unsupported {
        name: String,
        operation: OperationId,
    },

    /// A provider with the same name is already loaded
    #[error("Provider '{name}' is already loaded")]
    DuplicateProvider { name: String },
}

impl FetchError {
    /// Create an unsupported algorithm error
    pub fn unsupported(operation: OperationId, name: &str) -> Self {
        Self::Unsupported {
            name: name.to_string(),
            operation,
        }
    }

    /// Create a duplicate provider error
    pub fn duplicate_provider(name: &str) -> Self {
        Self::DuplicateProvider {
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_error() {
        let error = FetchError::unsupported(OperationId::KEYEXCH, "X25519");
        assert!(error.to_string().contains("Unsupported algorithm"));
        assert!(error.to_string().contains("X25519"));
        assert!(error.to_string().contains("keyexch"));
    }

    #[test]
    fn test_duplicate_provider_error() {
        let error = FetchError::duplicate_provider("default");
        assert!(error.to_string().contains("already loaded"));
        assert!(error.to_string().contains("default"));
    }
}
