//! axum handlers for the client-facing MCP endpoints

pub mod aggregation_mcp;
pub mod service_mcp;

use axum::http::HeaderMap;

use toolgate_core::GatewayError;

use crate::i18n::{negotiate, Locale};

/// Locale negotiated from the request headers
pub(crate) fn request_locale(headers: &HeaderMap) -> Locale {
    negotiate(
        headers
            .get(axum::http::header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    )
}

/// Check a bearer credential against the stored token. An empty stored
/// token means the endpoint is open.
pub(crate) fn check_bearer(headers: &HeaderMap, expected: &str) -> Result<(), GatewayError> {
    if expected.is_empty() {
        return Ok(());
    }
    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    if presented != expected {
        return Err(GatewayError::unauthorized("access token mismatch"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    #[test]
    fn test_check_bearer() {
        let mut headers = HeaderMap::new();
        assert!(check_bearer(&headers, "").is_ok());
        assert!(check_bearer(&headers, "tok").is_err());

        headers.insert(AUTHORIZATION, "Bearer wrong".parse().unwrap());
        assert!(check_bearer(&headers, "tok").is_err());

        headers.insert(AUTHORIZATION, "Bearer tok".parse().unwrap());
        assert!(check_bearer(&headers, "tok").is_ok());

        // Non-bearer schemes never match
        headers.insert(AUTHORIZATION, "Basic dG9r".parse().unwrap());
        assert!(check_bearer(&headers, "tok").is_err());
    }
}
