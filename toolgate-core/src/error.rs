//! Error taxonomy for Toolgate operations
//!
//! Errors are classified into kinds rather than concrete types: the HTTP
//! adapter maps a kind to a status code, and user-facing kinds carry an
//! i18n message key plus optional template arguments. Crate-local error
//! enums across the workspace convert into [`GatewayError`] at the
//! service boundary.

use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Classification of a gateway error, used for HTTP status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input: invalid name, unknown category, malformed alias JSON
    Validation,
    /// Service, group, tool, or template does not exist
    NotFound,
    /// Access token mismatch
    Unauthorized,
    /// Feature disabled (service or endpoint not enabled)
    Forbidden,
    /// Attempt to delete a resource still referenced elsewhere
    Conflict,
    /// Network failure reaching a backend
    Transport,
    /// Bad JSON-RPC framing or failed MCP handshake
    Protocol,
    /// Operation exceeded its deadline
    Timeout,
    /// Database I/O, crypto, or other internal failure
    Internal,
}

/// Gateway error carrying a kind, an i18n key, and a rendered message
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    kind: ErrorKind,
    /// Message-catalog key, e.g. `service.not_found`
    key: &'static str,
    /// Template arguments in catalog order
    args: Vec<String>,
    /// Developer-facing message (English), used in logs and JSON-RPC errors
    message: String,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, key: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            key,
            args: Vec::new(),
            message: message.into(),
        }
    }

    /// Attach template arguments for catalog rendering
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    // Constructors for the common kinds

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, "common.invalid_input", message)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::new(
            ErrorKind::NotFound,
            "common.not_found",
            format!("{} not found", resource),
        )
        .with_args(vec![resource])
    }

    pub fn service_not_found(id: i32) -> Self {
        Self::new(
            ErrorKind::NotFound,
            "service.not_found",
            format!("service {} not found", id),
        )
        .with_args(vec![id.to_string()])
    }

    pub fn group_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorKind::NotFound,
            "group.not_found",
            format!("group '{}' not found", name),
        )
        .with_args(vec![name])
    }

    pub fn tool_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorKind::NotFound,
            "tool.not_found",
            format!("tool '{}' not found", name),
        )
        .with_args(vec![name])
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, "auth.invalid_token", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, "auth.feature_disabled", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, "common.conflict", message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, "backend.transport_error", message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, "backend.protocol_error", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, "common.timeout", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, "common.internal_error", message)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::internal(format!("serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_key() {
        let err = GatewayError::service_not_found(42);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.key(), "service.not_found");
        assert_eq!(err.args(), &["42".to_string()]);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_validation_constructor() {
        let err = GatewayError::validation("bad name");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "bad name");
    }
}
