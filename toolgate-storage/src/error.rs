//! Storage error types

use sea_orm::DbErr;
use thiserror::Error;
use toolgate_core::GatewayError;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-related errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for GatewayError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => GatewayError::not_found(what),
            other => GatewayError::internal(other.to_string()),
        }
    }
}
