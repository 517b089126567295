//! Router assembly

use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::handlers::{aggregation_mcp, service_mcp};

/// Build the client-facing router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/mcp/service/{id}", post(service_mcp::handle))
        .route("/mcp/aggregation/{group_name}", post(aggregation_mcp::handle))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
