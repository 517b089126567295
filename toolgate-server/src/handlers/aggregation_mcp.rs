//! `POST /mcp/aggregation/{group_name}`

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use toolgate_core::GatewayError;
use toolgate_mcp::protocol::{JsonRpcRequest, JsonRpcResponse};

use crate::context::AppContext;
use crate::errors::WebError;
use crate::handlers::{check_bearer, request_locale};

/// Serve the aggregation facade for one group
pub async fn handle(
    State(ctx): State<AppContext>,
    Path(group_name): Path<String>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Result<Json<JsonRpcResponse>, WebError> {
    let locale = request_locale(&headers);
    let fail = |error: GatewayError| WebError::new(error, locale);

    let group = ctx
        .groups
        .find_by_name(&group_name)
        .await
        .map_err(|e| fail(e.into()))?
        .ok_or_else(|| fail(GatewayError::group_not_found(&group_name)))?;

    if !group.enabled {
        return Err(fail(GatewayError::forbidden(format!(
            "group '{}' is disabled",
            group.name
        ))));
    }
    if !group.aggregation_enabled {
        return Err(fail(GatewayError::forbidden(format!(
            "aggregation for '{}' is not enabled",
            group.name
        ))));
    }
    check_bearer(&headers, &group.access_token).map_err(fail)?;

    let response = ctx.aggregation_handler.handle(&group, request).await;
    Ok(Json(response))
}
