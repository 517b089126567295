//! API-bridge execution
//!
//! Translates an MCP `tools/call` into one authenticated HTTP request
//! against the service's REST endpoint and maps the response back into
//! MCP content. HTTP-level failures (status ≥ 400) are structured
//! results, not errors, so an aggregating caller can observe them and
//! retry elsewhere; only network-level failures surface as errors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use toolgate_core::service::{Service, ServiceType};
use toolgate_core::GatewayError;
use toolgate_storage::ServiceRepository;
use toolgate_vault::{mask_key, Vault};

use crate::protocol::ToolContent;

/// Default timeout for one bridge request
const BRIDGE_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Structured outcome of a bridge call, serialised into the MCP result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeCallOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub content: Vec<ToolContent>,
}

/// Executes API-bridge tools over HTTP
pub struct ApiBridgeExecutor {
    services: ServiceRepository,
    vault: Arc<dyn Vault>,
    client: reqwest::Client,
    /// service name → tool name → endpoint path
    path_map: HashMap<String, HashMap<String, String>>,
}

impl ApiBridgeExecutor {
    pub fn new(services: ServiceRepository, vault: Arc<dyn Vault>) -> Self {
        Self {
            services,
            vault,
            client: reqwest::Client::new(),
            path_map: bundled_path_map(),
        }
    }

    /// Execute a tool of an api_bridge service
    pub async fn execute(
        &self,
        service_id: i32,
        tool_name: &str,
        arguments: Value,
    ) -> Result<BridgeCallOutcome, GatewayError> {
        let service = self
            .services
            .find_by_id(service_id)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::service_not_found(service_id))?;

        if !service.enabled {
            return Err(GatewayError::forbidden(format!(
                "service '{}' is disabled",
                service.name
            )));
        }
        if service.service_type != ServiceType::ApiBridge {
            return Err(GatewayError::validation(format!(
                "service '{}' is not an API bridge",
                service.name
            )));
        }
        if service.find_tool(tool_name).is_none() {
            return Err(GatewayError::tool_not_found(tool_name));
        }

        self.execute_on(&service, tool_name, arguments).await
    }

    /// Execute against an already-loaded service record
    pub async fn execute_on(
        &self,
        service: &Service,
        tool_name: &str,
        arguments: Value,
    ) -> Result<BridgeCallOutcome, GatewayError> {
        let api_key = if service.api_key_ciphertext.is_empty() {
            String::new()
        } else {
            self.vault
                .decrypt(&service.api_key_ciphertext)
                .map_err(|e| GatewayError::internal(format!("credential decrypt failed: {}", e)))?
        };

        let url = format!(
            "{}{}",
            service.api_endpoint.trim_end_matches('/'),
            self.api_path(&service.name, tool_name)
        );
        debug!(
            service = %service.name,
            tool = tool_name,
            url = %url,
            key = %mask_key(&api_key),
            "bridge request"
        );

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if !api_key.is_empty() {
            let name = if service.api_key_header.is_empty() {
                "Authorization"
            } else {
                service.api_key_header.as_str()
            };
            let value = if service.api_key_prefix.is_empty() {
                api_key.clone()
            } else {
                format!("{} {}", service.api_key_prefix, api_key)
            };
            insert_header(&mut headers, name, &value)?;
        }
        // Custom headers land last so an operator can override the shaped
        // auth header when a backend needs something unusual
        for (name, value) in &service.headers {
            insert_header(&mut headers, name, value)?;
        }

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .timeout(BRIDGE_REQUEST_TIMEOUT)
            .json(&arguments)
            .send()
            .await
            .map_err(|e| GatewayError::transport(format!("bridge request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::transport(format!("bridge response read failed: {}", e)))?;

        if status.as_u16() >= 400 {
            let error = format!("API returned status {}", status.as_u16());
            warn!(service = %service.name, tool = tool_name, %status, "bridge call failed");
            return Ok(BridgeCallOutcome {
                success: false,
                result: None,
                error: Some(error.clone()),
                content: vec![ToolContent::text(format!("Error: {}", error))],
            });
        }

        let result = serde_json::from_str::<Value>(&body)
            .unwrap_or_else(|_| serde_json::json!({"text": body}));
        Ok(BridgeCallOutcome {
            success: true,
            result: Some(result),
            error: None,
            content: vec![ToolContent::text(body)],
        })
    }

    /// Endpoint path for a tool: the data-driven map first, then the
    /// `/{tool}` fallback
    pub fn api_path(&self, service_name: &str, tool_name: &str) -> String {
        lookup_api_path(&self.path_map, service_name, tool_name)
    }
}

fn lookup_api_path(
    path_map: &HashMap<String, HashMap<String, String>>,
    service_name: &str,
    tool_name: &str,
) -> String {
    if let Some(paths) = path_map.get(service_name) {
        if let Some(path) = paths.get(tool_name) {
            return path.clone();
        }
    }
    format!("/{}", tool_name)
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), GatewayError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| GatewayError::validation(format!("bad header name '{}': {}", name, e)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| GatewayError::validation(format!("bad header value: {}", e)))?;
    headers.insert(name, value);
    Ok(())
}

/// Built-in per-service path overrides. Services not listed here use the
/// tool name as the path.
fn bundled_path_map() -> HashMap<String, HashMap<String, String>> {
    let mut map = HashMap::new();
    let exa: HashMap<String, String> = [
        ("search", "/search"),
        ("find_similar", "/findSimilar"),
        ("get_contents", "/contents"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    map.insert("exa-search".to_string(), exa);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use toolgate_core::tool::ToolDefinition;
    use toolgate_storage::testing::connect_memory;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bridge_service(name: &str, endpoint: &str, key: &str) -> Service {
        Service {
            id: 0,
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            category: "search".into(),
            sort: 0,
            enabled: true,
            service_type: ServiceType::ApiBridge,
            command: String::new(),
            args: vec![],
            cwd: String::new(),
            api_endpoint: endpoint.to_string(),
            api_key_name: "API_KEY".into(),
            api_key_ciphertext: key.to_string(),
            api_key_header: "x-api-key".into(),
            api_key_prefix: String::new(),
            headers: HashMap::new(),
            env_defs: vec![],
            env_defaults: HashMap::new(),
            tools: vec![
                ToolDefinition::new("search", "Web search", json!({"type":"object"})),
                ToolDefinition::new("get_contents", "Fetch pages", json!({"type":"object"})),
            ],
            rpd_limit: 0,
            mcp_enabled: true,
            access_token: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn executor() -> (ApiBridgeExecutor, ServiceRepository) {
        let db = connect_memory().await;
        let repo = ServiceRepository::new(db);
        let vault: Arc<dyn Vault> = Arc::from(toolgate_vault::from_key(""));
        (ApiBridgeExecutor::new(repo.clone(), vault), repo)
    }

    #[test]
    fn test_api_path_mapping() {
        let map = bundled_path_map();
        assert_eq!(lookup_api_path(&map, "exa-search", "search"), "/search");
        assert_eq!(
            lookup_api_path(&map, "exa-search", "find_similar"),
            "/findSimilar"
        );
        assert_eq!(
            lookup_api_path(&map, "exa-search", "get_contents"),
            "/contents"
        );
        assert_eq!(lookup_api_path(&map, "anything-else", "xyz"), "/xyz");
        assert_eq!(lookup_api_path(&map, "exa-search", "unlisted"), "/unlisted");
    }

    #[tokio::test]
    async fn test_happy_path_header_and_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("x-api-key", "k"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"query": "AI"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"results":[]}"#),
            )
            .mount(&server)
            .await;

        let (exec, repo) = executor().await;
        let svc = repo
            .create(&bridge_service("exa-search", &server.uri(), "k"))
            .await
            .unwrap();

        let outcome = exec
            .execute(svc.id, "search", json!({"query": "AI"}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.result.unwrap(), json!({"results": []}));
        assert_eq!(
            outcome.content,
            vec![ToolContent::text(r#"{"results":[]}"#)]
        );
    }

    #[tokio::test]
    async fn test_http_error_is_structured_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (exec, repo) = executor().await;
        let svc = repo
            .create(&bridge_service("exa-search", &server.uri(), "k"))
            .await
            .unwrap();

        let outcome = exec.execute(svc.id, "search", json!({})).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("API returned status 500"));
        assert_eq!(
            outcome.content,
            vec![ToolContent::text("Error: API returned status 500")]
        );
    }

    #[tokio::test]
    async fn test_prefix_shapes_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let (exec, repo) = executor().await;
        let mut service = bridge_service("other-api", &server.uri(), "tok");
        service.api_key_header = String::new();
        service.api_key_prefix = "Bearer".into();
        let svc = repo.create(&service).await.unwrap();

        let outcome = exec.execute(svc.id, "search", json!({})).await.unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_rejections() {
        let (exec, repo) = executor().await;
        // Unknown service
        assert!(exec.execute(999, "search", json!({})).await.is_err());

        // Disabled service
        let mut disabled = bridge_service("d", "http://localhost:1", "");
        disabled.enabled = false;
        let disabled = repo.create(&disabled).await.unwrap();
        assert!(exec.execute(disabled.id, "search", json!({})).await.is_err());

        // Unknown tool
        let svc = repo
            .create(&bridge_service("e", "http://localhost:1", ""))
            .await
            .unwrap();
        assert!(exec.execute(svc.id, "nope", json!({})).await.is_err());
    }
}
