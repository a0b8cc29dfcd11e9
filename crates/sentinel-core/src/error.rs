//! Error types for Sentinel.

use thiserror::Error;

/// Result type alias using `SentinelError`.
pub type Result<T> = std::result::Result<T, SentinelError>;

/// Errors that can occur during risk-scoring operations.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    Validation(String),

    /// Configuration was rejected; prior configuration remains in effect.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external collaborator (cache, behavioral scorer) was unavailable.
    ///
    /// Always recovered at the call boundary with a documented default.
    #[error("Collaborator unavailable: {0}")]
    Collaborator(String),

    /// A detector was queried before training.
    #[error("Detector not trained: {0}")]
    NotTrained(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout waiting for a sub-computation.
    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Internal invariant violation; callers degrade to a neutral default.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SentinelError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        SentinelError::Validation(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        SentinelError::Config(msg.into())
    }

    /// Create a collaborator error.
    #[must_use]
    pub fn collaborator(msg: impl Into<String>) -> Self {
        SentinelError::Collaborator(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        SentinelError::Internal(msg.into())
    }

    /// Returns true if the error is recoverable with a local default.
    ///
    /// No recoverable error may abort a single-transaction assessment.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SentinelError::Collaborator(_)
                | SentinelError::NotTrained(_)
                | SentinelError::Timeout(_)
                | SentinelError::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SentinelError::validation("amount missing");
        assert_eq!(err.to_string(), "Input validation failed: amount missing");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(SentinelError::collaborator("redis down").is_recoverable());
        assert!(SentinelError::NotTrained("ensemble".into()).is_recoverable());
        assert!(!SentinelError::config("weights do not sum to 1").is_recoverable());
    }
}
