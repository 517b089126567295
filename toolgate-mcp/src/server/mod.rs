//! JSON-RPC handlers exposed to gateway clients

pub mod aggregation;
pub mod service_handler;

pub use aggregation::AggregationHandler;
pub use service_handler::ServiceMcpHandler;

use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use serde::de::DeserializeOwned;

/// Gateway version advertised in `serverInfo`
pub const SERVER_VERSION: &str = "1.0.0";

/// Decode `params` into the expected shape, mapping failure to `-32602`
fn decode_params<T: DeserializeOwned>(
    request: &JsonRpcRequest,
) -> Result<T, JsonRpcError> {
    let params = request
        .params
        .clone()
        .unwrap_or(serde_json::Value::Object(Default::default()));
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

/// Wrap a handler outcome into the JSON-RPC envelope
fn respond(
    result: Result<serde_json::Value, JsonRpcError>,
    id: Option<serde_json::Value>,
) -> JsonRpcResponse {
    match result {
        Ok(value) => JsonRpcResponse::success(value, id),
        Err(error) => JsonRpcResponse::error(error, id),
    }
}
