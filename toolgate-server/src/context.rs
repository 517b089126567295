//! Shared application state

use std::sync::Arc;

use toolgate_mcp::{AggregationHandler, ServiceMcpHandler};
use toolgate_registry::{GroupRegistry, McpJsonImporter, ServiceRegistry};
use toolgate_storage::{GroupRepository, ServiceRepository};

/// State shared across the HTTP handlers. The registries are the
/// integration point for the administrative surface and the import
/// command.
#[derive(Clone)]
pub struct AppContext {
    pub services: ServiceRepository,
    pub groups: GroupRepository,
    pub service_handler: Arc<ServiceMcpHandler>,
    pub aggregation_handler: Arc<AggregationHandler>,
    pub service_registry: Arc<ServiceRegistry>,
    pub group_registry: Arc<GroupRegistry>,
}

impl AppContext {
    pub fn importer(&self) -> McpJsonImporter {
        McpJsonImporter::new(self.service_registry.clone())
    }
}
