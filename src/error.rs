//! Error types for book reconstruction and replay.
//!
//! Every variant is fatal for the replay that raised it: the session never
//! resumes past an inconsistent or malformed event.

use thiserror::Error;

/// Result type alias for book operations.
pub type Result<T> = std::result::Result<T, BookError>;

/// Main error type for book reconstruction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    /// Order without a resolvable side, or an unknown side code
    #[error("Invalid side: {0}")]
    InvalidSide(String),

    /// Delete references an id absent from both sides of the book
    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    /// Update event arrived before any subscribe/reset event
    #[error("No active subscription for update #{sequence}")]
    NoActiveSubscription {
        /// Sequence number of the offending update
        sequence: u64,
    },

    /// Required field absent or unparsable
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Depth must be at least one level
    #[error("Invalid depth: {0} (must be >= 1)")]
    InvalidDepth(usize),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl BookError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        BookError::Generic(msg.into())
    }

    /// Create a malformed-event error from any string-like type.
    pub fn malformed(msg: impl Into<String>) -> Self {
        BookError::MalformedEvent(msg.into())
    }
}

impl From<std::io::Error> for BookError {
    fn from(err: std::io::Error) -> Self {
        BookError::Generic(format!("IO error: {err}"))
    }
}

impl From<String> for BookError {
    fn from(err: String) -> Self {
        BookError::Generic(err)
    }
}

impl From<&str> for BookError {
    fn from(err: &str) -> Self {
        BookError::Generic(err.to_string())
    }
}
