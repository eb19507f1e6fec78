//! Core error types.

use thiserror::Error;

/// Errors produced by pure core operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Input could not be normalized into a valid domain name.
    #[error("invalid domain name: {input}")]
    InvalidDomain { input: String },
}

impl CoreError {
    pub fn invalid_domain(input: impl Into<String>) -> Self {
        CoreError::InvalidDomain {
            input: input.into(),
        }
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
