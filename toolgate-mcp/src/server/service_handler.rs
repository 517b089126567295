//! Per-service MCP endpoint
//!
//! A transparent JSON-RPC facade over one registered service: initialize
//! describes the service, tools/list serves the cached toolset, and
//! tools/call delegates API-bridge tools to the executor. For live MCP
//! backends the call path returns a structured acceptance stub; the
//! session-per-call delegation is intentionally not wired up here.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use toolgate_core::service::{Service, ServiceType};
use toolgate_storage::CallLogRepository;

use crate::bridge::ApiBridgeExecutor;
use crate::protocol::{methods, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Tool};
use crate::server::{decode_params, respond, SERVER_VERSION};
use crate::tool_cache::ToolCacheService;
use crate::MCP_PROTOCOL_VERSION;

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// JSON-RPC handler for `POST /mcp/service/{id}`
pub struct ServiceMcpHandler {
    tool_cache: ToolCacheService,
    bridge: Arc<ApiBridgeExecutor>,
    call_logs: CallLogRepository,
}

impl ServiceMcpHandler {
    pub fn new(
        tool_cache: ToolCacheService,
        bridge: Arc<ApiBridgeExecutor>,
        call_logs: CallLogRepository,
    ) -> Self {
        Self {
            tool_cache,
            bridge,
            call_logs,
        }
    }

    /// Dispatch one request against an already-authorised service
    pub async fn handle(&self, service: &Service, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        match request.method.as_str() {
            methods::INITIALIZE => respond(Ok(self.initialize(service)), id),
            methods::NOTIFICATION_INITIALIZED => respond(Ok(json!({})), id),
            methods::TOOLS_LIST => respond(self.tools_list(service).await, id),
            methods::TOOLS_CALL => {
                let params = match decode_params::<CallParams>(&request) {
                    Ok(params) => params,
                    Err(error) => return JsonRpcResponse::error(error, id),
                };
                respond(self.tools_call(service, params).await, id)
            }
            methods::PING => respond(Ok(json!({})), id),
            other => JsonRpcResponse::error(JsonRpcError::method_not_found(other), id),
        }
    }

    fn initialize(&self, service: &Service) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {
                "name": format!("toolgate-{}", service.name),
                "version": SERVER_VERSION,
            },
            "instructions": service.description,
        })
    }

    async fn tools_list(&self, service: &Service) -> Result<Value, JsonRpcError> {
        let tools = self
            .tool_cache
            .get_service_tools(service.id, false)
            .await
            .map_err(|e| JsonRpcError::internal_error(e.message().to_string()))?;

        let wire: Vec<Tool> = tools
            .entry
            .tools
            .iter()
            .map(|t| Tool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.effective_schema(),
            })
            .collect();
        Ok(json!({"tools": wire}))
    }

    async fn tools_call(
        &self,
        service: &Service,
        params: CallParams,
    ) -> Result<Value, JsonRpcError> {
        let tools = self
            .tool_cache
            .get_service_tools(service.id, false)
            .await
            .map_err(|e| JsonRpcError::internal_error(e.message().to_string()))?;
        if !tools.entry.tools.iter().any(|t| t.name == params.name) {
            return Err(JsonRpcError::method_not_found(&params.name));
        }

        let started = std::time::Instant::now();
        let result = match service.service_type {
            ServiceType::ApiBridge => self
                .bridge
                .execute_on(service, &params.name, params.arguments.clone())
                .await
                .and_then(|outcome| Ok(serde_json::to_value(outcome)?)),
            other => Ok(json!({
                "service": service.name,
                "tool": params.name,
                "type": other.as_str(),
                "arguments": params.arguments,
                "content": [{
                    "type": "text",
                    "text": format!(
                        "Tool '{}' on service '{}' accepted",
                        params.name, service.name
                    ),
                }],
            })),
        };

        let duration_ms = started.elapsed().as_millis() as i64;
        match result {
            Ok(value) => {
                self.log_call(service.id, &params.name, true, "", duration_ms)
                    .await;
                Ok(value)
            }
            Err(e) => {
                self.log_call(service.id, &params.name, false, e.message(), duration_ms)
                    .await;
                Err(JsonRpcError::internal_error(e.message().to_string()))
            }
        }
    }

    async fn log_call(
        &self,
        service_id: i32,
        tool: &str,
        success: bool,
        error: &str,
        duration_ms: i64,
    ) {
        if let Err(e) = self
            .call_logs
            .record(service_id, tool, success, error, duration_ms)
            .await
        {
            warn!(service_id, "call log write failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DiscoveryResult, ToolDiscovery};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::time::Duration;
    use toolgate_core::tool::ToolDefinition;
    use toolgate_storage::testing::connect_memory;
    use toolgate_storage::{ServiceRepository, ToolCacheRepository};
    use toolgate_vault::Vault;

    struct NoDiscovery;

    #[async_trait]
    impl ToolDiscovery for NoDiscovery {
        async fn discover(&self, _service: &Service, _timeout: Duration) -> DiscoveryResult {
            DiscoveryResult::failure("no backend in tests")
        }
    }

    async fn setup() -> (ServiceMcpHandler, ServiceRepository, ToolCacheRepository) {
        let db = connect_memory().await;
        let services = ServiceRepository::new(db.clone());
        let cache_repo = ToolCacheRepository::new(db.clone());
        let vault: Arc<dyn Vault> = Arc::from(toolgate_vault::from_key(""));
        let bridge = Arc::new(ApiBridgeExecutor::new(services.clone(), vault));
        let tool_cache = ToolCacheService::new(
            cache_repo.clone(),
            services.clone(),
            Arc::new(NoDiscovery),
            Duration::from_secs(1800),
            Duration::from_secs(86400),
            Duration::from_secs(5),
        );
        let handler = ServiceMcpHandler::new(tool_cache, bridge, CallLogRepository::new(db));
        (handler, services, cache_repo)
    }

    fn bridge_service() -> Service {
        Service {
            id: 0,
            name: "exa-search".into(),
            display_name: "Exa".into(),
            description: "Web search".into(),
            category: "search".into(),
            sort: 0,
            enabled: true,
            service_type: ServiceType::ApiBridge,
            command: String::new(),
            args: vec![],
            cwd: String::new(),
            api_endpoint: "http://localhost:1".into(),
            api_key_name: String::new(),
            api_key_ciphertext: String::new(),
            api_key_header: String::new(),
            api_key_prefix: String::new(),
            headers: HashMap::new(),
            env_defs: vec![],
            env_defaults: HashMap::new(),
            tools: vec![ToolDefinition::new("search", "Search", json!({}))],
            rpd_limit: 0,
            mcp_enabled: true,
            access_token: "tok".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest::new(method, params, json!(1))
    }

    #[tokio::test]
    async fn test_initialize_shape() {
        let (handler, services, _cache_repo) = setup().await;
        let svc = services.create(&bridge_service()).await.unwrap();

        let response = handler.handle(&svc, request("initialize", None)).await;
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "toolgate-exa-search");
        assert_eq!(result["serverInfo"]["version"], "1.0.0");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(result["instructions"], "Web search");
    }

    #[tokio::test]
    async fn test_tools_list_substitutes_empty_schema() {
        let (handler, services, _cache_repo) = setup().await;
        let svc = services.create(&bridge_service()).await.unwrap();

        let response = handler.handle(&svc, request("tools/list", None)).await;
        let tools = response.result.unwrap()["tools"].clone();
        assert_eq!(tools[0]["name"], "search");
        assert_eq!(
            tools[0]["inputSchema"],
            json!({"type": "object", "properties": {}})
        );
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_params() {
        let (handler, services, _cache_repo) = setup().await;
        let svc = services.create(&bridge_service()).await.unwrap();

        let response = handler.handle(&svc, request("resources/list", None)).await;
        assert_eq!(response.error.unwrap().code, -32601);

        let response = handler
            .handle(&svc, request("tools/call", Some(json!({"arguments": {}}))))
            .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_initialized_notification_acknowledged() {
        let (handler, services, _cache_repo) = setup().await;
        let svc = services.create(&bridge_service()).await.unwrap();

        let response = handler
            .handle(&svc, request("notifications/initialized", None))
            .await;
        assert_eq!(response.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_stub_for_live_transport() {
        let (handler, services, cache_repo) = setup().await;
        let mut svc = bridge_service();
        svc.service_type = ServiceType::Stdio;
        svc.command = "npx".into();
        let svc = services.create(&svc).await.unwrap();

        // Seed the tool cache so tools/call can resolve the tool without a
        // live backend
        let now = Utc::now();
        let mut entry = toolgate_core::cache::CachedServiceTools::new(
            svc.id,
            vec![ToolDefinition::new("search", "", json!({}))],
            now,
        );
        entry.server_name = "stub".into();
        cache_repo.upsert(&entry).await.unwrap();

        let response = handler
            .handle(
                &svc,
                request(
                    "tools/call",
                    Some(json!({"name": "search", "arguments": {"q": "x"}})),
                ),
            )
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["service"], "exa-search");
        assert_eq!(result["type"], "stdio");
        assert_eq!(result["arguments"]["q"], "x");
        assert!(result["content"].is_array());
    }

    #[tokio::test]
    async fn test_unknown_tool_rejected() {
        let (handler, services, _cache_repo) = setup().await;
        let svc = services.create(&bridge_service()).await.unwrap();

        let response = handler
            .handle(
                &svc,
                request("tools/call", Some(json!({"name": "nope", "arguments": {}}))),
            )
            .await;
        assert_eq!(response.error.unwrap().code, -32601);
    }
}
