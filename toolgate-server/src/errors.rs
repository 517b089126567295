//! HTTP error mapping
//!
//! Gateway error kinds map onto HTTP statuses; bodies carry the i18n key
//! and the message rendered for the negotiated locale.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use toolgate_core::{ErrorKind, GatewayError};

use crate::i18n::{self, Locale};

/// A gateway error paired with the request's locale
#[derive(Debug)]
pub struct WebError {
    error: GatewayError,
    locale: Locale,
}

impl WebError {
    pub fn new(error: GatewayError, locale: Locale) -> Self {
        Self { error, locale }
    }

    /// HTTP status for an error kind
    pub fn status_code(kind: ErrorKind) -> StatusCode {
        match kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Transport | ErrorKind::Protocol | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = Self::status_code(self.error.kind());
        let localized = i18n::message(
            self.locale,
            self.error.key(),
            self.error.args(),
            self.error.message(),
        );
        let body = json!({
            "error": {
                "key": self.error.key(),
                "message": localized,
            }
        });
        (status, Json(body)).into_response()
    }
}
