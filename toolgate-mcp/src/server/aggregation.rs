//! Aggregation endpoint
//!
//! A fixed facade over one service group. Four tools are advertised:
//! `list_all_tools`, `search_tools`, `execute_tool` and `smart_execute`;
//! `list_similar_tools` answers when called but is not listed.
//! `smart_execute` resolves aliases, collects candidate services, and
//! retries across them with weighted-random selection dampened by each
//! service's recent error rate. A service excluded after a failure is
//! never retried within the same call.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use toolgate_core::group::ServiceGroup;
use toolgate_core::service::{Service, ServiceType};
use toolgate_storage::{CallLogRepository, ServiceRepository};

use crate::bridge::ApiBridgeExecutor;
use crate::protocol::{methods, JsonRpcError, JsonRpcErrorCode, JsonRpcRequest, JsonRpcResponse};
use crate::selection::{pick_weighted, Candidate, ServiceStatsRegistry};
use crate::server::{decode_params, respond, SERVER_VERSION};
use crate::tool_cache::ToolCacheService;
use crate::MCP_PROTOCOL_VERSION;

/// The advertised toolset
const TOOL_LIST_ALL: &str = "list_all_tools";
const TOOL_SEARCH: &str = "search_tools";
const TOOL_EXECUTE: &str = "execute_tool";
const TOOL_SMART_EXECUTE: &str = "smart_execute";
/// Implemented but deliberately not advertised
const TOOL_LIST_SIMILAR: &str = "list_similar_tools";

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct SearchToolsArgs {
    mcp_name: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteToolArgs {
    mcp_name: String,
    tool_name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct SmartExecuteArgs {
    tool_name: String,
    #[serde(default)]
    arguments: Value,
    #[serde(default)]
    max_retries: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ListSimilarArgs {
    tool_name: String,
}

/// YAML row of `list_all_tools`
#[derive(Debug, Serialize)]
struct ListedTool {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
    services: Vec<String>,
}

/// YAML row of `search_tools`
#[derive(Debug, Serialize)]
struct ServiceTool {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// One attempt in the `_smart_execute` log
#[derive(Debug, Clone, Serialize)]
struct AttemptRecord {
    service: String,
    attempt: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// A service that can answer the resolved tool, with its own spelling
struct ToolCandidate {
    service: Service,
    /// The name this service knows the tool by
    actual_tool: String,
    weight: u32,
}

/// JSON-RPC handler for `POST /mcp/aggregation/{group_name}`
pub struct AggregationHandler {
    services: ServiceRepository,
    tool_cache: ToolCacheService,
    bridge: Arc<ApiBridgeExecutor>,
    stats: Arc<ServiceStatsRegistry>,
    call_logs: CallLogRepository,
}

impl AggregationHandler {
    pub fn new(
        services: ServiceRepository,
        tool_cache: ToolCacheService,
        bridge: Arc<ApiBridgeExecutor>,
        stats: Arc<ServiceStatsRegistry>,
        call_logs: CallLogRepository,
    ) -> Self {
        Self {
            services,
            tool_cache,
            bridge,
            stats,
            call_logs,
        }
    }

    /// Dispatch one request against an already-authorised group
    pub async fn handle(&self, group: &ServiceGroup, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        match request.method.as_str() {
            methods::INITIALIZE => respond(Ok(self.initialize(group)), id),
            methods::NOTIFICATION_INITIALIZED => respond(Ok(json!({})), id),
            methods::TOOLS_LIST => respond(Ok(advertised_tools()), id),
            methods::TOOLS_CALL => {
                let params = match decode_params::<CallParams>(&request) {
                    Ok(params) => params,
                    Err(error) => return JsonRpcResponse::error(error, id),
                };
                respond(self.dispatch_tool(group, params).await, id)
            }
            methods::PING => respond(Ok(json!({})), id),
            other => JsonRpcResponse::error(JsonRpcError::method_not_found(other), id),
        }
    }

    fn initialize(&self, group: &ServiceGroup) -> Value {
        // Deliberately minimal: enough to bias a client toward the intended
        // workflow, not a stable text contract
        let mut instructions = String::new();
        if !group.description.is_empty() {
            instructions.push_str(&group.description);
            instructions.push('\n');
        }
        instructions.push_str("Use list_all_tools first, then smart_execute.");
        if !group.tool_aliases.is_empty() {
            let mut pairs: Vec<String> = group
                .tool_aliases
                .0
                .iter()
                .map(|(canonical, entry)| format!("{}={}", canonical, entry.aliases.join(",")))
                .collect();
            pairs.sort();
            instructions.push_str(&format!("\naliases: {}", pairs.join("; ")));
        }

        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {
                "name": format!("toolgate-group-{}", group.name),
                "version": SERVER_VERSION,
            },
            "instructions": instructions,
        })
    }

    async fn dispatch_tool(
        &self,
        group: &ServiceGroup,
        params: CallParams,
    ) -> Result<Value, JsonRpcError> {
        match params.name.as_str() {
            TOOL_LIST_ALL => self.list_all_tools(group).await,
            TOOL_SEARCH => {
                let args: SearchToolsArgs = decode_args(params.arguments)?;
                self.search_tools(group, &args.mcp_name).await
            }
            TOOL_EXECUTE => {
                let args: ExecuteToolArgs = decode_args(params.arguments)?;
                self.execute_tool(group, &args.mcp_name, &args.tool_name, args.arguments)
                    .await
            }
            TOOL_SMART_EXECUTE => {
                let args: SmartExecuteArgs = decode_args(params.arguments)?;
                self.smart_execute(group, &args.tool_name, args.arguments, args.max_retries)
                    .await
            }
            TOOL_LIST_SIMILAR => {
                let args: ListSimilarArgs = decode_args(params.arguments)?;
                self.list_similar_tools(group, &args.tool_name).await
            }
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    /// Enabled member services, in the group's stored order
    async fn member_services(&self, group: &ServiceGroup) -> Result<Vec<Service>, JsonRpcError> {
        let found = self
            .services
            .find_by_ids(&group.service_ids)
            .await
            .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;
        let by_id: HashMap<i32, Service> =
            found.into_iter().map(|s| (s.id, s)).collect();
        Ok(group
            .service_ids
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .filter(|s| s.enabled)
            .collect())
    }

    /// Cached tools of one member; failures are absorbed as an empty list
    async fn tools_of(&self, service: &Service) -> Vec<toolgate_core::ToolDefinition> {
        match self.tool_cache.get_service_tools(service.id, false).await {
            Ok(tools) => tools.entry.tools,
            Err(e) => {
                warn!(service = service.id, "tool listing failed: {}", e.message());
                Vec::new()
            }
        }
    }

    async fn list_all_tools(&self, group: &ServiceGroup) -> Result<Value, JsonRpcError> {
        struct Unified {
            descriptions: Vec<String>,
            services: Vec<String>,
        }
        let mut unified: HashMap<String, Unified> = HashMap::new();

        for service in self.member_services(group).await? {
            for tool in self.tools_of(&service).await {
                let canonical = group.tool_aliases.canonical_of(&tool.name);
                let entry = unified.entry(canonical).or_insert_with(|| Unified {
                    descriptions: Vec::new(),
                    services: Vec::new(),
                });
                if !tool.description.is_empty() {
                    entry.descriptions.push(tool.description.clone());
                }
                if !entry.services.contains(&service.name) {
                    entry.services.push(service.name.clone());
                }
            }
        }

        let mut rows: Vec<ListedTool> = unified
            .into_iter()
            .map(|(name, entry)| {
                // A user-provided description wins; otherwise the shortest
                // non-empty backend description (token economy)
                let desc = group
                    .tool_aliases
                    .description_of(&name)
                    .map(|d| d.to_string())
                    .or_else(|| {
                        entry
                            .descriptions
                            .iter()
                            .min_by_key(|d| d.len())
                            .cloned()
                    });
                ListedTool {
                    name,
                    desc,
                    services: entry.services,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));

        to_yaml_result(&rows)
    }

    async fn search_tools(
        &self,
        group: &ServiceGroup,
        mcp_name: &str,
    ) -> Result<Value, JsonRpcError> {
        let service = self
            .member_services(group)
            .await?
            .into_iter()
            .find(|s| s.name == mcp_name)
            .ok_or_else(|| {
                JsonRpcError::invalid_params(format!(
                    "service '{}' not found or disabled in this group",
                    mcp_name
                ))
            })?;

        let rows: Vec<ServiceTool> = self
            .tools_of(&service)
            .await
            .into_iter()
            .map(|tool| ServiceTool {
                name: tool.name.clone(),
                desc: if tool.description.is_empty() {
                    None
                } else {
                    Some(tool.description.clone())
                },
                params: tool
                    .schema_properties()
                    .map(|props| Value::Object(props.clone())),
            })
            .collect();

        to_yaml_result(&rows)
    }

    async fn execute_tool(
        &self,
        group: &ServiceGroup,
        mcp_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, JsonRpcError> {
        let service = self
            .member_services(group)
            .await?
            .into_iter()
            .find(|s| s.name == mcp_name)
            .ok_or_else(|| {
                JsonRpcError::invalid_params(format!(
                    "service '{}' not found or disabled in this group",
                    mcp_name
                ))
            })?;

        if !self.tools_of(&service).await.iter().any(|t| t.name == tool_name) {
            return Err(JsonRpcError::method_not_found(tool_name));
        }

        match self.run_tool(&service, tool_name, arguments).await {
            Ok(value) => Ok(value),
            Err(error) => Err(JsonRpcError::internal_error(error)),
        }
    }

    /// Execute one tool on one service, recording stats and the call log.
    /// A structured bridge failure (`success=false`) is an `Err` here so
    /// `smart_execute` treats it as a failed attempt.
    async fn run_tool(
        &self,
        service: &Service,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, String> {
        let started = std::time::Instant::now();
        let outcome: Result<Value, String> = match service.service_type {
            ServiceType::ApiBridge => {
                match self
                    .bridge
                    .execute_on(service, tool_name, arguments.clone())
                    .await
                {
                    Ok(outcome) if outcome.success => {
                        serde_json::to_value(outcome).map_err(|e| e.to_string())
                    }
                    Ok(outcome) => Err(outcome
                        .error
                        .unwrap_or_else(|| "bridge call failed".to_string())),
                    Err(e) => Err(e.message().to_string()),
                }
            }
            other => Ok(json!({
                "service": service.name,
                "tool": tool_name,
                "type": other.as_str(),
                "arguments": arguments,
                "content": [{
                    "type": "text",
                    "text": format!(
                        "Tool '{}' on service '{}' accepted",
                        tool_name, service.name
                    ),
                }],
            })),
        };

        let success = outcome.is_ok();
        let error = outcome.as_ref().err().cloned().unwrap_or_default();
        self.stats
            .record(service.id, success, (!success).then_some(error.as_str()));
        let duration_ms = started.elapsed().as_millis() as i64;
        if let Err(e) = self
            .call_logs
            .record(service.id, tool_name, success, &error, duration_ms)
            .await
        {
            warn!(service = service.id, "call log write failed: {}", e);
        }
        outcome
    }

    async fn smart_execute(
        &self,
        group: &ServiceGroup,
        tool_name: &str,
        arguments: Value,
        max_retries: Option<usize>,
    ) -> Result<Value, JsonRpcError> {
        let canonical = group.tool_aliases.canonical_of(tool_name);
        let matching_names = group.tool_aliases.expansion_of(&canonical);

        // Candidates: every enabled member owning any matching tool name
        let mut candidates: Vec<ToolCandidate> = Vec::new();
        for service in self.member_services(group).await? {
            let tools = self.tools_of(&service).await;
            if let Some(tool) = tools
                .iter()
                .find(|t| matching_names.iter().any(|n| n == &t.name))
            {
                candidates.push(ToolCandidate {
                    actual_tool: tool.name.clone(),
                    weight: group.weight_of(service.id),
                    service,
                });
            }
        }

        if candidates.is_empty() {
            return Err(JsonRpcError::new(
                JsonRpcErrorCode::MethodNotFound,
                format!("tool '{}' not found in any enabled service", tool_name),
            ));
        }

        let cap = candidates.len() - 1;
        let max_retries = max_retries.unwrap_or(cap).min(cap);

        let mut excluded: Vec<i32> = Vec::new();
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut last_error = String::new();

        for attempt in 1..=max_retries + 1 {
            let remaining: Vec<Candidate> = candidates
                .iter()
                .filter(|c| !excluded.contains(&c.service.id))
                .map(|c| Candidate {
                    service_id: c.service.id,
                    weight: c.weight,
                    error_rate: self.stats.error_rate(c.service.id),
                })
                .collect();
            let Some(picked) = pick_weighted(&remaining) else {
                break;
            };
            let candidate = candidates
                .iter()
                .find(|c| c.service.id == picked.service_id)
                .ok_or_else(|| JsonRpcError::internal_error("candidate vanished"))?;

            match self
                .run_tool(&candidate.service, &candidate.actual_tool, arguments.clone())
                .await
            {
                Ok(mut value) => {
                    attempts.push(AttemptRecord {
                        service: candidate.service.name.clone(),
                        attempt,
                        success: Some(true),
                        error: None,
                    });
                    if let Some(object) = value.as_object_mut() {
                        object.insert(
                            "_smart_execute".to_string(),
                            json!({
                                "tool": canonical,
                                "selected_service": candidate.service.name,
                                "attempts": attempts,
                            }),
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    attempts.push(AttemptRecord {
                        service: candidate.service.name.clone(),
                        attempt,
                        success: None,
                        error: Some(error.clone()),
                    });
                    excluded.push(candidate.service.id);
                    last_error = error;
                }
            }
        }

        Err(JsonRpcError::server_error(
            JsonRpcErrorCode::ServerError.code(),
            format!(
                "smart_execute failed after {} attempts; last error: {}",
                attempts.len(),
                last_error
            ),
            Some(json!({"attempts": attempts})),
        ))
    }

    /// Tools across the group whose names resemble the query. Answered but
    /// not advertised in tools/list.
    async fn list_similar_tools(
        &self,
        group: &ServiceGroup,
        tool_name: &str,
    ) -> Result<Value, JsonRpcError> {
        let needle = tool_name.to_lowercase();
        let mut rows: Vec<ListedTool> = Vec::new();
        for service in self.member_services(group).await? {
            for tool in self.tools_of(&service).await {
                if !tool.name.to_lowercase().contains(&needle) {
                    continue;
                }
                match rows.iter_mut().find(|r| r.name == tool.name) {
                    Some(row) => {
                        if !row.services.contains(&service.name) {
                            row.services.push(service.name.clone());
                        }
                    }
                    None => rows.push(ListedTool {
                        name: tool.name.clone(),
                        desc: None,
                        services: vec![service.name.clone()],
                    }),
                }
            }
        }
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        to_yaml_result(&rows)
    }
}

fn decode_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, JsonRpcError> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

/// Serialise rows to YAML and wrap them as MCP text content
fn to_yaml_result<T: Serialize>(rows: &T) -> Result<Value, JsonRpcError> {
    let yaml = serde_yaml::to_string(rows)
        .map_err(|e| JsonRpcError::internal_error(format!("YAML encoding failed: {}", e)))?;
    Ok(json!({
        "content": [{"type": "text", "text": yaml}],
    }))
}

/// Schemas of the four advertised tools
fn advertised_tools() -> Value {
    json!({
        "tools": [
            {
                "name": TOOL_LIST_ALL,
                "description": "List every tool available in this group, unified across services",
                "inputSchema": {"type": "object", "properties": {}},
            },
            {
                "name": TOOL_SEARCH,
                "description": "List one service's tools with their parameter schemas",
                "inputSchema": {
                    "type": "object",
                    "properties": {"mcp_name": {"type": "string"}},
                    "required": ["mcp_name"],
                },
            },
            {
                "name": TOOL_EXECUTE,
                "description": "Execute a named tool on a named service",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "mcp_name": {"type": "string"},
                        "tool_name": {"type": "string"},
                        "arguments": {"type": "object"},
                    },
                    "required": ["mcp_name", "tool_name"],
                },
            },
            {
                "name": TOOL_SMART_EXECUTE,
                "description": "Execute a tool on the best available service with automatic failover",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "tool_name": {"type": "string"},
                        "arguments": {"type": "object"},
                        "max_retries": {"type": "integer", "minimum": 0},
                    },
                    "required": ["tool_name"],
                },
            },
        ],
    })
}
