//! Error types for MCP operations

use std::time::Duration;
use thiserror::Error;

use toolgate_core::{ErrorKind, GatewayError};

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Error type for MCP operations
#[derive(Error, Debug)]
pub enum McpError {
    /// Transport-level errors
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Connection-related errors
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// Protocol-level errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Invalid JSON-RPC message
    #[error("Invalid JSON-RPC message: {details}")]
    InvalidJsonRpc { details: String },

    /// MCP method not found
    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    /// Invalid method parameters
    #[error("Invalid parameters for method {method}: {details}")]
    InvalidParams { method: String, details: String },

    /// Tool not found
    #[error("Tool not found: {tool_name}")]
    ToolNotFound { tool_name: String },

    /// Tool execution error
    #[error("Tool execution failed: {tool_name}: {reason}")]
    ToolExecutionFailed { tool_name: String, reason: String },

    /// Request timeout
    #[error("Request timeout after {timeout:?}")]
    RequestTimeout { timeout: Duration },

    /// Serialization/deserialization errors
    #[error("Serialization error: {details}")]
    Serialization { details: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl McpError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a connection failed error
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a tool not found error
    pub fn tool_not_found(tool_name: impl Into<String>) -> Self {
        Self::ToolNotFound {
            tool_name: tool_name.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// Implement conversions from common error types
impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::Serialization {
            details: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for McpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            McpError::RequestTimeout {
                timeout: Duration::from_secs(crate::DEFAULT_REQUEST_TIMEOUT_SECS),
            }
        } else if err.is_connect() {
            McpError::ConnectionFailed {
                reason: err.to_string(),
            }
        } else {
            McpError::Transport {
                message: err.to_string(),
            }
        }
    }
}

impl From<std::io::Error> for McpError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => McpError::RequestTimeout {
                timeout: Duration::from_secs(crate::DEFAULT_REQUEST_TIMEOUT_SECS),
            },
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected => McpError::ConnectionFailed {
                reason: err.to_string(),
            },
            _ => McpError::Transport {
                message: err.to_string(),
            },
        }
    }
}

impl From<toolgate_runtime::RuntimeError> for McpError {
    fn from(err: toolgate_runtime::RuntimeError) -> Self {
        McpError::Transport {
            message: format!("Runtime error: {}", err),
        }
    }
}

impl From<toolgate_storage::StorageError> for McpError {
    fn from(err: toolgate_storage::StorageError) -> Self {
        McpError::Internal {
            message: format!("Storage error: {}", err),
        }
    }
}

impl From<McpError> for GatewayError {
    fn from(err: McpError) -> Self {
        let kind = match &err {
            McpError::Transport { .. } | McpError::ConnectionFailed { .. } => ErrorKind::Transport,
            McpError::Protocol { .. }
            | McpError::InvalidJsonRpc { .. }
            | McpError::Serialization { .. } => ErrorKind::Protocol,
            McpError::MethodNotFound { .. } | McpError::ToolNotFound { .. } => ErrorKind::NotFound,
            McpError::InvalidParams { .. } => ErrorKind::Validation,
            McpError::RequestTimeout { .. } => ErrorKind::Timeout,
            McpError::ToolExecutionFailed { .. } | McpError::Internal { .. } => ErrorKind::Internal,
        };
        GatewayError::new(kind, "backend.mcp_error", err.to_string())
    }
}
