//! Server assembly and lifecycle

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use toolgate_config::ToolgateConfig;
use toolgate_mcp::{
    AggregationHandler, ApiBridgeExecutor, DiscoveryClient, ServiceMcpHandler,
    ServiceStatsRegistry, ToolCacheService,
};
use toolgate_registry::{GroupRegistry, ServiceRegistry};
use toolgate_runtime::RuntimeInstaller;
use toolgate_storage::{
    CallLogRepository, DatabaseConnection, GroupRepository, ServiceRepository,
    ToolCacheRepository,
};
use toolgate_vault::Vault;

use crate::app::create_router;
use crate::context::AppContext;

/// Wire the full runtime from configuration and serve until ctrl-c.
/// The database pool is closed explicitly on the way out.
pub async fn serve(config: ToolgateConfig) -> anyhow::Result<()> {
    let db = DatabaseConnection::new(
        &config.database.url,
        config.database.max_connections,
        config.database.connect_timeout,
    )
    .await?;
    db.migrate().await?;

    let ctx = build_context(&config, db.clone());

    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
    info!("listening on {}", config.server.bind_address());

    axum::serve(listener, create_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

/// Assemble the handler graph over one database connection
pub fn build_context(config: &ToolgateConfig, db: DatabaseConnection) -> AppContext {
    let services = ServiceRepository::new(db.clone());
    let groups = GroupRepository::new(db.clone());
    let tool_cache_repo = ToolCacheRepository::new(db.clone());
    let call_logs = CallLogRepository::new(db);

    let vault: Arc<dyn Vault> = Arc::from(toolgate_vault::from_key(&config.vault.encryption_key));
    let installer = Arc::new(RuntimeInstaller::new(
        config.runtime.data_dir.clone(),
        config.runtime.proxy_url.clone(),
    ));
    let discovery = Arc::new(DiscoveryClient::new(installer));
    let bridge = Arc::new(ApiBridgeExecutor::new(services.clone(), vault.clone()));
    let stats = Arc::new(ServiceStatsRegistry::new());

    let tool_cache = ToolCacheService::new(
        tool_cache_repo.clone(),
        services.clone(),
        discovery.clone(),
        config.cache.soft_ttl,
        config.cache.hard_ttl,
        config.discovery.request_timeout,
    );

    let service_handler = Arc::new(ServiceMcpHandler::new(
        tool_cache.clone(),
        bridge.clone(),
        call_logs.clone(),
    ));
    let aggregation_handler = Arc::new(AggregationHandler::new(
        services.clone(),
        tool_cache,
        bridge.clone(),
        stats,
        call_logs.clone(),
    ));

    let service_registry = Arc::new(ServiceRegistry::new(
        services.clone(),
        groups.clone(),
        tool_cache_repo,
        call_logs,
        discovery,
        bridge,
        vault,
        config.cache.list_ttl,
    ));
    let group_registry = Arc::new(GroupRegistry::new(
        groups.clone(),
        services.clone(),
        config.cache.list_ttl,
    ));

    AppContext {
        services,
        groups,
        service_handler,
        aggregation_handler,
        service_registry,
        group_registry,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut stream =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(_) => return std::future::pending().await,
            };
        stream.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
    // Give in-flight responses a moment to drain
    tokio::time::sleep(Duration::from_millis(100)).await;
}
