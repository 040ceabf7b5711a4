//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
///
/// A deny is never an error: unknown principals, unknown permissions and
/// missing grants all resolve to `Ok(false)`. These variants cover caller
/// bugs, administrative mistakes and infrastructure failures.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Invalid call (missing principal or permission)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced entity does not exist (administrative mutations only)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store lookup failed
    #[error("Store error: {0}")]
    Store(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid seed document
    #[error("Seed error: {0}")]
    Seed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// Whether the error signals a caller bug rather than an outage
    pub fn is_invalid_call(&self) -> bool {
        matches!(self, AuthzError::InvalidInput(_))
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
