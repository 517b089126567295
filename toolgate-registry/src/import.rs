//! MCP-JSON import
//!
//! Accepts the configuration shape used by Claude Desktop and friends:
//! `{"mcpServers": {"name": {command, args, env, url, headers, type,
//! disabled, cwd}}}`. Unknown per-server fields are ignored. Imported
//! names are sanitised and de-duplicated; discovery runs concurrently
//! across entries through a bounded worker pool with a lowered timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use toolgate_core::service::ServiceType;
use toolgate_core::{GatewayError, GatewayResult};

use crate::naming::sanitize_import_name;
use crate::service::{NewService, ServiceRegistry};

/// Concurrent discovery workers during import
const IMPORT_WORKERS: usize = 5;

/// Lowered discovery budget per imported entry
const IMPORT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Top-level import document
#[derive(Debug, Deserialize)]
struct McpJsonDocument {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: HashMap<String, McpJsonServer>,
}

/// One server entry. Unknown fields (`autoApprove`, `disabledTools`, …)
/// are accepted and dropped.
#[derive(Debug, Clone, Default, Deserialize)]
struct McpJsonServer {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default, rename = "type")]
    server_type: Option<String>,
    #[serde(default)]
    disabled: bool,
}

/// Result of importing one entry
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    Created { name: String, id: i32 },
    Skipped { name: String, reason: String },
    Failed { name: String, error: String },
}

/// Summary of a whole import run
#[derive(Debug, Default)]
pub struct ImportReport {
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    pub fn created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ImportOutcome::Created { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ImportOutcome::Failed { .. }))
            .count()
    }
}

/// Imports MCP-JSON documents through the service registry
pub struct McpJsonImporter {
    registry: Arc<ServiceRegistry>,
}

impl McpJsonImporter {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    /// Parse and import a document, creating one service per entry
    pub async fn import(&self, document: &str) -> GatewayResult<ImportReport> {
        let document: McpJsonDocument = serde_json::from_str(document)
            .map_err(|e| GatewayError::validation(format!("invalid MCP JSON: {}", e)))?;

        let semaphore = Arc::new(Semaphore::new(IMPORT_WORKERS));
        let mut handles = Vec::new();

        for (raw_name, server) in document.mcp_servers {
            let registry = self.registry.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closes");
                import_one(&registry, &raw_name, server).await
            }));
        }

        let mut report = ImportReport::default();
        for handle in handles {
            match handle.await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => report.outcomes.push(ImportOutcome::Failed {
                    name: String::new(),
                    error: format!("import task panicked: {}", e),
                }),
            }
        }
        info!(
            created = report.created(),
            failed = report.failed(),
            "MCP JSON import finished"
        );
        Ok(report)
    }
}

/// Type determination: explicit `type` wins, then url suffix, then command
fn determine_type(server: &McpJsonServer) -> Option<ServiceType> {
    if let Some(explicit) = &server.server_type {
        if let Some(ty) = ServiceType::parse(explicit) {
            return Some(ty);
        }
        // `"sse"`/`"http"` spellings from other clients
        match explicit.as_str() {
            "http" | "streamable-http" | "streamableHttp" => {
                return Some(ServiceType::StreamableHttp)
            }
            _ => {}
        }
    }
    if let Some(url) = &server.url {
        if url.trim_end_matches('/').ends_with("/sse") {
            return Some(ServiceType::Sse);
        }
        return Some(ServiceType::StreamableHttp);
    }
    if server.command.is_some() {
        return Some(ServiceType::Stdio);
    }
    None
}

async fn import_one(
    registry: &ServiceRegistry,
    raw_name: &str,
    server: McpJsonServer,
) -> ImportOutcome {
    let name = sanitize_import_name(raw_name);
    let Some(service_type) = determine_type(&server) else {
        return ImportOutcome::Skipped {
            name,
            reason: "entry has neither url nor command".into(),
        };
    };

    let input = NewService {
        name: name.clone(),
        service_type: Some(service_type),
        command: server.command.clone().unwrap_or_default(),
        args: server.args.clone(),
        cwd: server.cwd.clone().unwrap_or_default(),
        api_endpoint: server.url.clone().unwrap_or_default(),
        headers: server.headers.clone(),
        env_defaults: server.env.clone(),
        enabled: Some(!server.disabled),
        discovery_timeout: Some(IMPORT_DISCOVERY_TIMEOUT),
        lenient_token: true,
        ..Default::default()
    };

    match registry.create(input).await {
        Ok(created) => ImportOutcome::Created {
            name: created.name,
            id: created.id,
        },
        Err(e) => {
            warn!(name = %name, "import entry failed: {}", e.message());
            ImportOutcome::Failed {
                name,
                error: e.message().to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use toolgate_core::service::Service;
    use toolgate_mcp::{ApiBridgeExecutor, DiscoveryResult, ToolDiscovery};
    use toolgate_storage::testing::connect_memory;
    use toolgate_storage::{
        CallLogRepository, GroupRepository, ServiceRepository, ToolCacheRepository,
    };
    use toolgate_vault::Vault;

    struct NoDiscovery;

    #[async_trait]
    impl ToolDiscovery for NoDiscovery {
        async fn discover(&self, _service: &Service, _timeout: Duration) -> DiscoveryResult {
            DiscoveryResult::failure("offline")
        }
    }

    async fn importer() -> (McpJsonImporter, Arc<ServiceRegistry>) {
        let db = connect_memory().await;
        let services = ServiceRepository::new(db.clone());
        let vault: Arc<dyn Vault> = Arc::from(toolgate_vault::from_key(""));
        let registry = Arc::new(ServiceRegistry::new(
            services.clone(),
            GroupRepository::new(db.clone()),
            ToolCacheRepository::new(db.clone()),
            CallLogRepository::new(db),
            Arc::new(NoDiscovery),
            Arc::new(ApiBridgeExecutor::new(services, vault.clone())),
            vault,
            Duration::from_secs(30),
        ));
        (McpJsonImporter::new(registry.clone()), registry)
    }

    #[tokio::test]
    async fn test_import_stdio_entry() {
        let (importer, registry) = importer().await;
        let report = importer
            .import(
                r#"{"mcpServers": {"My Server": {"command": "npx", "args": ["-y", "pkg"],
                    "autoApprove": ["x"], "disabledTools": []}}}"#,
            )
            .await
            .unwrap();

        assert_eq!(report.created(), 1);
        let ImportOutcome::Created { name, id } = &report.outcomes[0] else {
            panic!("expected creation");
        };
        assert_eq!(name, "My-Server");

        let created = registry.get(*id).await.unwrap();
        assert_eq!(created.service_type, ServiceType::Stdio);
        assert_eq!(created.args, vec!["-y", "pkg"]);
        assert!(created.enabled);
    }

    #[tokio::test]
    async fn test_import_twice_renames() {
        let (importer, _registry) = importer().await;
        let doc = r#"{"mcpServers": {"My Server": {"command": "npx"}}}"#;
        importer.import(doc).await.unwrap();
        let report = importer.import(doc).await.unwrap();

        let ImportOutcome::Created { name, .. } = &report.outcomes[0] else {
            panic!("expected creation");
        };
        assert_eq!(name, "My-Server-2");
    }

    #[tokio::test]
    async fn test_type_determination() {
        let sse = McpJsonServer {
            url: Some("https://host/mcp/sse".into()),
            ..Default::default()
        };
        assert_eq!(determine_type(&sse), Some(ServiceType::Sse));

        let http = McpJsonServer {
            url: Some("https://host/mcp".into()),
            ..Default::default()
        };
        assert_eq!(determine_type(&http), Some(ServiceType::StreamableHttp));

        let stdio = McpJsonServer {
            command: Some("uvx".into()),
            ..Default::default()
        };
        assert_eq!(determine_type(&stdio), Some(ServiceType::Stdio));

        // Explicit type beats the url heuristic
        let explicit = McpJsonServer {
            url: Some("https://host/sse".into()),
            server_type: Some("streamable_http".into()),
            ..Default::default()
        };
        assert_eq!(determine_type(&explicit), Some(ServiceType::StreamableHttp));

        let empty = McpJsonServer::default();
        assert_eq!(determine_type(&empty), None);
    }

    #[tokio::test]
    async fn test_disabled_and_invalid_entries() {
        let (importer, registry) = importer().await;
        let report = importer
            .import(
                r#"{"mcpServers": {
                    "off": {"command": "npx", "disabled": true},
                    "empty": {}
                }}"#,
            )
            .await
            .unwrap();

        assert_eq!(report.created(), 1);
        let disabled = registry
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.name == "off")
            .unwrap();
        assert!(!disabled.enabled);
        assert!(report
            .outcomes
            .iter()
            .any(|o| matches!(o, ImportOutcome::Skipped { name, .. } if name == "empty")));
    }

    #[tokio::test]
    async fn test_bad_document_rejected() {
        let (importer, _) = importer().await;
        assert!(importer.import("not json").await.is_err());
    }
}
