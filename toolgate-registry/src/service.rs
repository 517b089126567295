//! Service management
//!
//! CRUD over the service repository plus the create-time conveniences:
//! duplicate names auto-renamed, best-effort discovery, category
//! inference from tools then from the name, display-name/description
//! backfill, and lazy MCP enablement with token minting. Discovery
//! failures during create and import are absorbed; an explicit test
//! propagates them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{info, warn};

use toolgate_core::category::{guess_category_from_name, infer_category_from_tools, ServiceCategory};
use toolgate_core::service::{validate_service_name, EnvVarDef, Service, ServiceType};
use toolgate_core::tool::ToolDefinition;
use toolgate_core::{GatewayError, GatewayResult};
use toolgate_mcp::{ApiBridgeExecutor, ToolDiscovery};
use toolgate_storage::{
    CallLogRepository, GroupRepository, ListPage, ListQuery, ServiceRepository,
    ToolCacheRepository,
};
use toolgate_vault::Vault;

use crate::naming::unique_service_name;
use crate::token::mint_access_token;

/// Discovery budget on create
const CREATE_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Input for creating a service. The API key arrives in plaintext and is
/// encrypted before it reaches storage.
#[derive(Debug, Clone, Default)]
pub struct NewService {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub service_type: Option<ServiceType>,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: String,
    pub api_endpoint: String,
    pub api_key_name: String,
    pub api_key: String,
    pub api_key_header: String,
    pub api_key_prefix: String,
    pub headers: HashMap<String, String>,
    pub env_defs: Vec<EnvVarDef>,
    pub env_defaults: HashMap<String, String>,
    pub tools: Vec<ToolDefinition>,
    pub rpd_limit: i32,
    pub enabled: Option<bool>,
    /// Lowered discovery budget for bulk import
    pub discovery_timeout: Option<Duration>,
    /// Import path: token-mint failure is logged, not fatal
    pub lenient_token: bool,
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateService {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sort: Option<i32>,
    pub enabled: Option<bool>,
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub cwd: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_key_header: Option<String>,
    pub api_key_prefix: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub env_defs: Option<Vec<EnvVarDef>>,
    pub env_defaults: Option<HashMap<String, String>>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub rpd_limit: Option<i32>,
    pub mcp_enabled: Option<bool>,
}

/// Administrative service management
pub struct ServiceRegistry {
    services: ServiceRepository,
    groups: GroupRepository,
    tool_cache: ToolCacheRepository,
    call_logs: CallLogRepository,
    discovery: Arc<dyn ToolDiscovery>,
    bridge: Arc<ApiBridgeExecutor>,
    vault: Arc<dyn Vault>,
    /// Short-lived full-list cache, double-checked on population
    list_cache: Mutex<Option<(Instant, Vec<Service>)>>,
    list_ttl: Duration,
}

impl ServiceRegistry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        services: ServiceRepository,
        groups: GroupRepository,
        tool_cache: ToolCacheRepository,
        call_logs: CallLogRepository,
        discovery: Arc<dyn ToolDiscovery>,
        bridge: Arc<ApiBridgeExecutor>,
        vault: Arc<dyn Vault>,
        list_ttl: Duration,
    ) -> Self {
        Self {
            services,
            groups,
            tool_cache,
            call_logs,
            discovery,
            bridge,
            vault,
            list_cache: Mutex::new(None),
            list_ttl,
        }
    }

    fn invalidate_list_cache(&self) {
        *self.list_cache.lock() = None;
    }

    /// All services, served from the short-lived cache when fresh
    pub async fn list_all(&self) -> GatewayResult<Vec<Service>> {
        {
            let cache = self.list_cache.lock();
            if let Some((at, services)) = cache.as_ref() {
                if at.elapsed() < self.list_ttl {
                    return Ok(services.clone());
                }
            }
        }
        let services = self.services.find_all().await?;
        {
            // Double-checked: a concurrent reader may have repopulated
            let mut cache = self.list_cache.lock();
            if cache
                .as_ref()
                .map(|(at, _)| at.elapsed() >= self.list_ttl)
                .unwrap_or(true)
            {
                *cache = Some((Instant::now(), services.clone()));
            }
        }
        Ok(services)
    }

    /// Paged admin listing; goes straight to the store
    pub async fn list(&self, query: &ListQuery) -> GatewayResult<ListPage<Service>> {
        Ok(self.services.list(query).await?)
    }

    pub async fn get(&self, id: i32) -> GatewayResult<Service> {
        self.services
            .find_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::service_not_found(id))
    }

    /// Create a service with the full create-time pipeline
    pub async fn create(&self, input: NewService) -> GatewayResult<Service> {
        validate_service_name(&input.name)?;
        let service_type = input
            .service_type
            .ok_or_else(|| GatewayError::validation("service_type is required"))?;
        if service_type == ServiceType::Stdio && input.command.is_empty() {
            return Err(GatewayError::validation("stdio services require a command"));
        }
        if service_type != ServiceType::Stdio && input.api_endpoint.is_empty() {
            return Err(GatewayError::validation(format!(
                "{} services require an api_endpoint",
                service_type
            )));
        }
        if !input.category.is_empty() && ServiceCategory::parse(&input.category).is_none() {
            return Err(GatewayError::validation(format!(
                "unknown category '{}'",
                input.category
            )));
        }

        let name = unique_service_name(&self.services, &input.name).await?;
        let api_key_ciphertext = if input.api_key.is_empty() {
            String::new()
        } else {
            self.vault
                .encrypt(&input.api_key)
                .map_err(|e| GatewayError::internal(format!("credential encrypt failed: {}", e)))?
        };

        let now = Utc::now();
        let mut service = Service {
            id: 0,
            display_name: if input.display_name.is_empty() {
                name.clone()
            } else {
                input.display_name
            },
            name,
            description: input.description,
            category: input.category,
            sort: 0,
            enabled: input.enabled.unwrap_or(true),
            service_type,
            command: input.command,
            args: input.args,
            cwd: input.cwd,
            api_endpoint: input.api_endpoint,
            api_key_name: input.api_key_name,
            api_key_ciphertext,
            api_key_header: input.api_key_header,
            api_key_prefix: input.api_key_prefix,
            headers: input.headers,
            env_defs: input.env_defs,
            env_defaults: input.env_defaults,
            tools: input.tools,
            rpd_limit: input.rpd_limit,
            mcp_enabled: false,
            access_token: String::new(),
            created_at: now,
            updated_at: now,
        };

        // Best-effort discovery when the caller supplied no tools
        if service_type.is_live_mcp() && service.tools.is_empty() {
            let timeout = input.discovery_timeout.unwrap_or(CREATE_DISCOVERY_TIMEOUT);
            let result = self.discovery.discover(&service, timeout).await;
            if result.success {
                service.tools = result.tools;
                if service.display_name == service.name && !result.server_name.is_empty() {
                    service.display_name = result.server_name;
                }
                if service.description.is_empty() {
                    service.description = result.description;
                }
            } else {
                // Absorbed: a tool-less service is still created
                warn!(
                    service = %service.name,
                    "discovery on create failed: {}",
                    result.error.unwrap_or_default()
                );
            }
        }

        if service.category.is_empty() {
            service.category = infer_category_from_tools(
                service.tools.iter().map(|t| t.name.as_str()),
            )
            .unwrap_or_else(|| guess_category_from_name(&service.name))
            .as_str()
            .to_string();
        }

        // Auto-enable the MCP endpoint once tools exist
        if !service.tools.is_empty() && service.service_type != ServiceType::ApiBridge {
            match mint_access_token() {
                Ok(token) => {
                    service.mcp_enabled = true;
                    service.access_token = token;
                }
                Err(e) if input.lenient_token => {
                    warn!(service = %service.name, "token mint failed on import: {}", e)
                }
                Err(e) => return Err(e),
            }
        }

        let created = self.services.create(&service).await?;
        self.invalidate_list_cache();
        info!(id = created.id, name = %created.name, "service created");
        Ok(created)
    }

    /// Partial update
    pub async fn update(&self, id: i32, patch: UpdateService) -> GatewayResult<Service> {
        let mut service = self.get(id).await?;

        if let Some(v) = patch.display_name {
            service.display_name = v;
        }
        if let Some(v) = patch.description {
            service.description = v;
        }
        if let Some(v) = patch.category {
            if ServiceCategory::parse(&v).is_none() {
                return Err(GatewayError::validation(format!("unknown category '{}'", v)));
            }
            service.category = v;
        }
        if let Some(v) = patch.sort {
            service.sort = v;
        }
        if let Some(v) = patch.enabled {
            service.enabled = v;
        }
        if let Some(v) = patch.command {
            service.command = v;
        }
        if let Some(v) = patch.args {
            service.args = v;
        }
        if let Some(v) = patch.cwd {
            service.cwd = v;
        }
        if let Some(v) = patch.api_endpoint {
            service.api_endpoint = v;
        }
        if let Some(v) = patch.api_key {
            service.api_key_ciphertext = if v.is_empty() {
                String::new()
            } else {
                self.vault.encrypt(&v).map_err(|e| {
                    GatewayError::internal(format!("credential encrypt failed: {}", e))
                })?
            };
        }
        if let Some(v) = patch.api_key_header {
            service.api_key_header = v;
        }
        if let Some(v) = patch.api_key_prefix {
            service.api_key_prefix = v;
        }
        if let Some(v) = patch.headers {
            service.headers = v;
        }
        if let Some(v) = patch.env_defs {
            service.env_defs = v;
        }
        if let Some(v) = patch.env_defaults {
            service.env_defaults = v;
        }
        if let Some(v) = patch.tools {
            service.tools = v;
        }
        if let Some(v) = patch.rpd_limit {
            service.rpd_limit = v;
        }
        if let Some(v) = patch.mcp_enabled {
            service.mcp_enabled = v;
            if v && service.access_token.is_empty() {
                service.access_token = mint_access_token()?;
            }
        }
        service.updated_at = Utc::now();

        let updated = self.services.update(&service).await?;
        self.invalidate_list_cache();
        Ok(updated)
    }

    /// Replace the access token, minting lazily if absent
    pub async fn regenerate_token(&self, id: i32) -> GatewayResult<String> {
        let mut service = self.get(id).await?;
        service.access_token = mint_access_token()?;
        service.updated_at = Utc::now();
        self.services.update(&service).await?;
        self.invalidate_list_cache();
        Ok(service.access_token)
    }

    /// Delete a service unless a group still references it. Dependent
    /// tool-cache and log rows are removed best-effort.
    pub async fn delete(&self, id: i32) -> GatewayResult<()> {
        let referencing = self.groups.groups_referencing(id).await?;
        if !referencing.is_empty() {
            return Err(GatewayError::conflict(format!(
                "service {} is still referenced by group(s): {}",
                id,
                referencing.join(", ")
            )));
        }
        self.services.delete(id).await?;
        if let Err(e) = self.tool_cache.delete_by_service(id).await {
            warn!(id, "tool cache cleanup failed: {}", e);
        }
        if let Err(e) = self.call_logs.delete_by_service(id).await {
            warn!(id, "call log cleanup failed: {}", e);
        }
        self.invalidate_list_cache();
        Ok(())
    }

    /// Remove every service in one transaction, clearing group memberships
    pub async fn delete_all(&self) -> GatewayResult<u64> {
        let deleted = self.services.delete_all().await?;
        self.invalidate_list_cache();
        Ok(deleted)
    }

    /// Explicit service test. API bridges execute a real tool with default
    /// arguments; live services run a full discovery and persist the
    /// result. Failures propagate.
    pub async fn test_service(&self, id: i32, tool: Option<&str>) -> GatewayResult<Value> {
        let mut service = self.get(id).await?;

        match service.service_type {
            ServiceType::ApiBridge => {
                let tool_name = match tool {
                    Some(name) => name.to_string(),
                    None => service
                        .tools
                        .first()
                        .map(|t| t.name.clone())
                        .ok_or_else(|| {
                            GatewayError::validation("service declares no tools to test")
                        })?,
                };
                let arguments = default_test_arguments(&tool_name);
                let outcome = self
                    .bridge
                    .execute_on(&service, &tool_name, arguments)
                    .await?;
                if !outcome.success {
                    return Err(GatewayError::transport(
                        outcome.error.unwrap_or_else(|| "test call failed".into()),
                    ));
                }
                // A passing test on a fresh bridge exposes its endpoint
                if !service.mcp_enabled {
                    service.mcp_enabled = true;
                    service.access_token = mint_access_token()?;
                    service.updated_at = Utc::now();
                    self.services.update(&service).await?;
                    self.invalidate_list_cache();
                }
                Ok(serde_json::to_value(outcome)?)
            }
            _ => {
                let result = self
                    .discovery
                    .discover(&service, CREATE_DISCOVERY_TIMEOUT)
                    .await;
                if !result.success {
                    return Err(GatewayError::transport(
                        result.error.unwrap_or_else(|| "discovery failed".into()),
                    ));
                }
                service.tools = result.tools.clone();
                if !service.tools.is_empty() && !service.mcp_enabled {
                    service.mcp_enabled = true;
                    service.access_token = mint_access_token()?;
                }
                service.updated_at = Utc::now();
                self.services.update(&service).await?;
                self.invalidate_list_cache();
                Ok(json!({
                    "success": true,
                    "server_name": result.server_name,
                    "server_version": result.server_version,
                    "tools": result.tools.len(),
                }))
            }
        }
    }
}

/// Per-tool default arguments used by the bridge test call
fn default_test_arguments(tool_name: &str) -> Value {
    let lowered = tool_name.to_lowercase();
    if lowered.contains("search") || lowered.contains("query") || lowered.contains("find") {
        json!({"query": "test", "num_results": 1})
    } else if lowered.contains("content") || lowered.contains("fetch") || lowered.contains("url") {
        json!({"urls": ["https://example.com"]})
    } else {
        json!({})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use toolgate_mcp::DiscoveryResult;
    use toolgate_storage::testing::connect_memory;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FakeDiscovery {
        result: DiscoveryResult,
    }

    #[async_trait]
    impl ToolDiscovery for FakeDiscovery {
        async fn discover(&self, _service: &Service, _timeout: Duration) -> DiscoveryResult {
            self.result.clone()
        }
    }

    fn ok_discovery() -> DiscoveryResult {
        DiscoveryResult {
            success: true,
            server_name: "Exa MCP".into(),
            server_version: "1.2.0".into(),
            description: "Web search over MCP".into(),
            tools: vec![ToolDefinition::new(
                "web_search",
                "Search the web",
                json!({"type":"object","properties":{}}),
            )],
            error: None,
        }
    }

    async fn registry_with(discovery: DiscoveryResult) -> ServiceRegistry {
        let db = connect_memory().await;
        let services = ServiceRepository::new(db.clone());
        let vault: Arc<dyn Vault> = Arc::from(toolgate_vault::from_key("unit-test-key"));
        ServiceRegistry::new(
            services.clone(),
            GroupRepository::new(db.clone()),
            ToolCacheRepository::new(db.clone()),
            CallLogRepository::new(db),
            Arc::new(FakeDiscovery { result: discovery }),
            Arc::new(ApiBridgeExecutor::new(services, vault.clone())),
            vault,
            Duration::from_secs(30),
        )
    }

    fn stdio_input(name: &str) -> NewService {
        NewService {
            name: name.to_string(),
            service_type: Some(ServiceType::Stdio),
            command: "npx".into(),
            args: vec!["-y".into(), "server".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_discovers_backfills_and_enables() {
        let registry = registry_with(ok_discovery()).await;
        let created = registry.create(stdio_input("exa")).await.unwrap();

        assert_eq!(created.tools.len(), 1);
        // Backfilled from discovery
        assert_eq!(created.display_name, "Exa MCP");
        assert_eq!(created.description, "Web search over MCP");
        // Tool names win category inference: web_search → search
        assert_eq!(created.category, "search");
        // Tools exist → endpoint enabled with a token
        assert!(created.mcp_enabled);
        assert_eq!(created.access_token.len(), 32);
    }

    #[tokio::test]
    async fn test_create_absorbs_discovery_failure() {
        let registry = registry_with(DiscoveryResult::failure("boom")).await;
        let created = registry.create(stdio_input("postgres-mcp")).await.unwrap();

        assert!(created.tools.is_empty());
        assert!(!created.mcp_enabled);
        assert!(created.access_token.is_empty());
        // Name-based inference fallback
        assert_eq!(created.category, "database");
    }

    #[tokio::test]
    async fn test_duplicate_names_auto_renamed() {
        let registry = registry_with(DiscoveryResult::failure("no")).await;
        let a = registry.create(stdio_input("same")).await.unwrap();
        let b = registry.create(stdio_input("same")).await.unwrap();
        let c = registry.create(stdio_input("same")).await.unwrap();
        assert_eq!(a.name, "same");
        assert_eq!(b.name, "same-2");
        assert_eq!(c.name, "same-3");
    }

    #[tokio::test]
    async fn test_validation_rejections() {
        let registry = registry_with(DiscoveryResult::failure("no")).await;

        let mut input = stdio_input("ok");
        input.name = "9bad".into();
        assert!(registry.create(input).await.is_err());

        let mut input = stdio_input("ok");
        input.command = String::new();
        assert!(registry.create(input).await.is_err());

        let mut input = stdio_input("ok");
        input.category = "not-a-category".into();
        assert!(registry.create(input).await.is_err());
    }

    #[tokio::test]
    async fn test_api_key_stored_encrypted() {
        let registry = registry_with(DiscoveryResult::failure("no")).await;
        let mut input = NewService {
            name: "bridge".into(),
            service_type: Some(ServiceType::ApiBridge),
            api_endpoint: "https://api.example.com".into(),
            api_key: "sk-secret".into(),
            ..Default::default()
        };
        input.tools = vec![ToolDefinition::new("search", "", json!({}))];
        let created = registry.create(input).await.unwrap();

        assert_ne!(created.api_key_ciphertext, "sk-secret");
        assert_eq!(
            registry.vault.decrypt(&created.api_key_ciphertext).unwrap(),
            "sk-secret"
        );
    }

    #[tokio::test]
    async fn test_delete_guard_on_group_membership() {
        let registry = registry_with(DiscoveryResult::failure("no")).await;
        let svc = registry.create(stdio_input("member")).await.unwrap();

        let mut group = toolgate_core::group::ServiceGroup {
            id: 0,
            name: "g".into(),
            description: String::new(),
            enabled: true,
            aggregation_enabled: true,
            access_token: String::new(),
            service_ids: vec![svc.id],
            weights: Default::default(),
            tool_aliases: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        group = registry.groups.create(&group).await.unwrap();

        let err = registry.delete(svc.id).await.unwrap_err();
        assert_eq!(err.kind(), toolgate_core::ErrorKind::Conflict);
        assert!(err.message().contains("g"));

        // Drop the membership and the delete goes through
        group.service_ids.clear();
        registry.groups.update(&group).await.unwrap();
        registry.delete(svc.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_cache_serves_within_ttl() {
        let registry = registry_with(DiscoveryResult::failure("no")).await;
        registry.create(stdio_input("one")).await.unwrap();

        let first = registry.list_all().await.unwrap();
        assert_eq!(first.len(), 1);

        // A write invalidates; the next read sees the new row
        registry.create(stdio_input("two")).await.unwrap();
        let second = registry.list_all().await.unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_test_service_bridge_enables_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":[]}"#))
            .mount(&server)
            .await;

        let registry = registry_with(DiscoveryResult::failure("no")).await;
        let input = NewService {
            name: "exa-search".into(),
            service_type: Some(ServiceType::ApiBridge),
            api_endpoint: server.uri(),
            tools: vec![ToolDefinition::new("search", "", json!({}))],
            ..Default::default()
        };
        let created = registry.create(input).await.unwrap();
        assert!(!created.mcp_enabled);

        let result = registry.test_service(created.id, None).await.unwrap();
        assert_eq!(result["success"], true);

        let reloaded = registry.get(created.id).await.unwrap();
        assert!(reloaded.mcp_enabled);
        assert!(!reloaded.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_test_service_failure_propagates() {
        let registry = registry_with(DiscoveryResult::failure("unreachable")).await;
        let created = registry.create(stdio_input("dead")).await.unwrap();
        let err = registry.test_service(created.id, None).await.unwrap_err();
        assert!(err.message().contains("unreachable"));
    }

    #[test]
    fn test_default_test_arguments_table() {
        assert_eq!(
            default_test_arguments("search"),
            json!({"query": "test", "num_results": 1})
        );
        assert_eq!(
            default_test_arguments("get_contents"),
            json!({"urls": ["https://example.com"]})
        );
        assert_eq!(default_test_arguments("other"), json!({}));
    }
}
