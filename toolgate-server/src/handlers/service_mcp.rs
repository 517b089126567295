//! `POST /mcp/service/{id}`

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use toolgate_core::GatewayError;
use toolgate_mcp::protocol::{JsonRpcRequest, JsonRpcResponse};

use crate::context::AppContext;
use crate::errors::WebError;
use crate::handlers::{check_bearer, request_locale};

/// Proxy one JSON-RPC request to a single registered service
pub async fn handle(
    State(ctx): State<AppContext>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Result<Json<JsonRpcResponse>, WebError> {
    let locale = request_locale(&headers);
    let fail = |error: GatewayError| WebError::new(error, locale);

    let service = ctx
        .services
        .find_by_id(id)
        .await
        .map_err(|e| fail(e.into()))?
        .ok_or_else(|| fail(GatewayError::service_not_found(id)))?;

    if !service.enabled {
        return Err(fail(GatewayError::forbidden(format!(
            "service '{}' is disabled",
            service.name
        ))));
    }
    if !service.mcp_enabled {
        return Err(fail(GatewayError::forbidden(format!(
            "MCP endpoint for '{}' is not enabled",
            service.name
        ))));
    }
    check_bearer(&headers, &service.access_token).map_err(fail)?;

    let response = ctx.service_handler.handle(&service, request).await;
    Ok(Json(response))
}
