//! Cache error types

use thiserror::Error;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors produced by cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Serialization failed for a store that persists values
    #[error("Serialization error: {details}")]
    Serialization { details: String },

    /// Backend store failure
    #[error("Store error: {message}")]
    Store { message: String },
}

impl CacheError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}
