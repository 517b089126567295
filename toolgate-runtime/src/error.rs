//! Runtime installer error types

use thiserror::Error;

use crate::kind::RuntimeKind;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors produced by the runtime installer and subprocess handling
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Command rejected by validation
    #[error("Command rejected: {reason}")]
    CommandRejected { reason: String },

    /// Runtime kind cannot be installed on this host
    #[error("Runtime not installable: {kind}")]
    NotInstallable { kind: RuntimeKind },

    /// Install script failed
    #[error("Install failed for {kind}: {details}")]
    InstallFailed { kind: RuntimeKind, details: String },

    /// Command still missing after install
    #[error("Command not found after install: {command}")]
    StillMissing { command: String },

    /// Install or spawn timed out
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// State file I/O failure
    #[error("State file error: {0}")]
    State(#[from] std::io::Error),

    /// State file serialization failure
    #[error("State serialization error: {0}")]
    StateSerialization(#[from] serde_json::Error),

    /// Subprocess spawn failure
    #[error("Spawn error: {details}")]
    Spawn { details: String },
}

impl RuntimeError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::CommandRejected {
            reason: reason.into(),
        }
    }
}
