//! Tool discovery against a live MCP backend
//!
//! One session per discovery: open the transport, run
//! `initialize` → `notifications/initialized` → `tools/list`, normalise
//! the result, close. Each leg is bounded by the caller's timeout and the
//! session never outlives the discovery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use toolgate_core::service::Service;
use toolgate_core::tool::{empty_object_schema, ToolDefinition};
use toolgate_runtime::RuntimeInstaller;

use crate::error::{McpError, McpResult};
use crate::protocol::{
    generate_request_id, methods, InitializeResult, JsonRpcRequest, Tool, ToolsListResult,
    MCP_PROTOCOL_VERSION,
};
use crate::transport::{open_transport, McpTransport};

/// Discovery session progress, tracked for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Opening,
    Initializing,
    Initialized,
    Listing,
    Closed,
    Failed,
}

/// Outcome of a discovery run. Failures are data, not errors: the caller
/// decides whether they are fatal (explicit test) or absorbed (create,
/// import, background refresh).
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryResult {
    pub success: bool,
    pub server_name: String,
    pub server_version: String,
    pub description: String,
    pub tools: Vec<ToolDefinition>,
    pub error: Option<String>,
}

impl DiscoveryResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            server_name: String::new(),
            server_version: String::new(),
            description: String::new(),
            tools: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Discovery seam: the registry and the tool cache depend on this trait so
/// tests can substitute scripted backends.
#[async_trait]
pub trait ToolDiscovery: Send + Sync {
    async fn discover(&self, service: &Service, timeout: Duration) -> DiscoveryResult;
}

/// Real discovery over the MCP transports
pub struct DiscoveryClient {
    installer: Arc<RuntimeInstaller>,
}

impl DiscoveryClient {
    pub fn new(installer: Arc<RuntimeInstaller>) -> Self {
        Self { installer }
    }

    async fn run_session(
        &self,
        service: &Service,
        timeout: Duration,
    ) -> McpResult<(InitializeResult, Vec<Tool>)> {
        let mut state = SessionState::Opening;
        let mut transport = open_transport(service, &self.installer, timeout).await?;

        let result = Self::drive(&mut *transport, &mut state, timeout).await;

        let _ = transport.close().await;
        state = if result.is_ok() {
            SessionState::Closed
        } else {
            SessionState::Failed
        };
        debug!(service = service.id, ?state, "discovery session finished");
        result
    }

    /// The handshake proper, shared with tests through `McpTransport`
    pub(crate) async fn drive(
        transport: &mut dyn McpTransport,
        state: &mut SessionState,
        timeout: Duration,
    ) -> McpResult<(InitializeResult, Vec<Tool>)> {
        *state = SessionState::Initializing;
        let init_request = JsonRpcRequest::new(
            methods::INITIALIZE,
            Some(json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "toolgate", "version": env!("CARGO_PKG_VERSION")},
            })),
            generate_request_id(),
        );
        let response = transport.request(init_request, timeout).await?;
        let init: InitializeResult = match (response.result, response.error) {
            (Some(result), None) => serde_json::from_value(result)
                .map_err(|e| McpError::protocol(format!("bad initialize result: {}", e)))?,
            (_, Some(err)) => {
                return Err(McpError::protocol(format!(
                    "initialize failed: {} ({})",
                    err.message, err.code
                )))
            }
            _ => return Err(McpError::protocol("empty initialize response")),
        };
        *state = SessionState::Initialized;

        transport
            .notify(JsonRpcRequest::notification(
                methods::NOTIFICATION_INITIALIZED,
                None,
            ))
            .await?;

        *state = SessionState::Listing;
        let list_request =
            JsonRpcRequest::new(methods::TOOLS_LIST, Some(json!({})), generate_request_id());
        let response = transport.request(list_request, timeout).await?;
        let list: ToolsListResult = match (response.result, response.error) {
            (Some(result), None) => serde_json::from_value(result)
                .map_err(|e| McpError::protocol(format!("bad tools/list result: {}", e)))?,
            (_, Some(err)) => {
                return Err(McpError::protocol(format!(
                    "tools/list failed: {} ({})",
                    err.message, err.code
                )))
            }
            _ => return Err(McpError::protocol("empty tools/list response")),
        };

        Ok((init, list.tools))
    }
}

/// Normalise a wire tool into the stored shape: the raw schema when the
/// backend sent an object, the minimal permissive schema otherwise.
fn normalize_tool(tool: Tool) -> ToolDefinition {
    let input_schema = match &tool.input_schema {
        serde_json::Value::Object(_) => tool.input_schema.clone(),
        _ => empty_object_schema(),
    };
    ToolDefinition {
        name: tool.name,
        description: tool.description,
        input_schema,
    }
}

#[async_trait]
impl ToolDiscovery for DiscoveryClient {
    async fn discover(&self, service: &Service, timeout: Duration) -> DiscoveryResult {
        match self.run_session(service, timeout).await {
            Ok((init, tools)) => DiscoveryResult {
                success: true,
                server_name: init.server_info.name,
                server_version: init.server_info.version,
                description: init.instructions.unwrap_or_default(),
                tools: tools.into_iter().map(normalize_tool).collect(),
                error: None,
            },
            Err(e) => DiscoveryResult::failure(e.to_string()),
        }
    }
}
