//! Two-tier tool cache with stale-while-revalidate
//!
//! Hot tier: the in-process KV cache under `mcp:tools:{id}` with TTL equal
//! to the hard TTL. Cold tier: the relational `tool_cache` table. A read
//! inside the soft window is served as-is; between soft and hard expiry
//! the stale payload is returned immediately while at most one background
//! refresh per service re-discovers; past the hard expiry the entry is
//! treated as absent and discovery runs synchronously.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};

use toolgate_caching::{KvCache, TtlCache};
use toolgate_core::cache::CachedServiceTools;
use toolgate_core::service::{Service, ServiceType};
use toolgate_core::GatewayError;
use toolgate_storage::{ServiceRepository, ToolCacheRepository};

use crate::client::ToolDiscovery;

/// Cached tools plus where they came from
#[derive(Debug, Clone)]
pub struct ToolsWithOrigin {
    pub entry: CachedServiceTools,
    pub from_cache: bool,
}

/// Stale-while-revalidate tool cache over discovery
#[derive(Clone)]
pub struct ToolCacheService {
    kv: Arc<TtlCache<String, CachedServiceTools>>,
    repo: ToolCacheRepository,
    services: ServiceRepository,
    discovery: Arc<dyn ToolDiscovery>,
    /// Services with a refresh in flight; single-flight guard
    refreshing: Arc<Mutex<HashSet<i32>>>,
    soft_ttl: Duration,
    hard_ttl: Duration,
    request_timeout: Duration,
}

impl ToolCacheService {
    pub fn new(
        repo: ToolCacheRepository,
        services: ServiceRepository,
        discovery: Arc<dyn ToolDiscovery>,
        soft_ttl: Duration,
        hard_ttl: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            kv: Arc::new(TtlCache::new(hard_ttl)),
            repo,
            services,
            discovery,
            refreshing: Arc::new(Mutex::new(HashSet::new())),
            soft_ttl,
            hard_ttl,
            request_timeout,
        }
    }

    fn kv_key(service_id: i32) -> String {
        format!("mcp:tools:{}", service_id)
    }

    /// Tools for a service, honouring the SWR freshness rules
    pub async fn get_service_tools(
        &self,
        service_id: i32,
        force_refresh: bool,
    ) -> Result<ToolsWithOrigin, GatewayError> {
        let service = self
            .services
            .find_by_id(service_id)
            .await?
            .ok_or_else(|| GatewayError::service_not_found(service_id))?;

        // API bridges carry their declared tools; no discovery ever runs
        if service.service_type == ServiceType::ApiBridge {
            let now = Utc::now();
            let mut entry = CachedServiceTools::new(service_id, service.tools.clone(), now);
            entry.server_name = service.name.clone();
            entry.server_description = service.description.clone();
            return Ok(ToolsWithOrigin {
                entry,
                from_cache: false,
            });
        }

        if force_refresh {
            let entry = self.discover_and_store(&service).await?;
            return Ok(ToolsWithOrigin {
                entry,
                from_cache: false,
            });
        }

        let now = Utc::now();
        if let Some(entry) = self.read_tiers(service_id).await {
            if !entry.is_hard_expired(now) {
                if entry.is_stale(now) {
                    self.spawn_refresh(service.clone());
                }
                return Ok(ToolsWithOrigin {
                    entry,
                    from_cache: true,
                });
            }
            // Hard-expired entries read as absent even when a tier still
            // holds them
        }

        let entry = self.discover_and_store(&service).await?;
        Ok(ToolsWithOrigin {
            entry,
            from_cache: false,
        })
    }

    /// KV first; on miss fall back to the relational tier
    async fn read_tiers(&self, service_id: i32) -> Option<CachedServiceTools> {
        match self.kv.get(&Self::kv_key(service_id)).await {
            Ok(Some(entry)) => return Some(entry),
            Ok(None) => {}
            Err(e) => warn!(service_id, "KV read failed: {}", e),
        }
        match self.repo.find_by_service(service_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(service_id, "tool cache read failed: {}", e);
                None
            }
        }
    }

    /// Kick off at most one background refresh per service
    fn spawn_refresh(&self, service: Service) {
        {
            let mut refreshing = self.refreshing.lock();
            if !refreshing.insert(service.id) {
                return;
            }
        }
        let this = self.clone();
        tokio::spawn(async move {
            let service_id = service.id;
            if let Err(e) = this.discover_and_store(&service).await {
                // Background refreshes are absorbed; the stale entry stays
                warn!(service_id, "background refresh failed: {}", e);
            }
            this.refreshing.lock().remove(&service_id);
        });
    }

    /// Discover synchronously and write both tiers
    async fn discover_and_store(
        &self,
        service: &Service,
    ) -> Result<CachedServiceTools, GatewayError> {
        let result = self
            .discovery
            .discover(service, self.request_timeout)
            .await;
        if !result.success {
            return Err(GatewayError::transport(
                result
                    .error
                    .unwrap_or_else(|| "discovery failed".to_string()),
            ));
        }

        let now = Utc::now();
        let mut entry = CachedServiceTools::new(service.id, result.tools, now);
        entry.soft_expiry =
            now + chrono::Duration::from_std(self.soft_ttl).unwrap_or_else(|_| chrono::Duration::zero());
        entry.hard_expiry =
            now + chrono::Duration::from_std(self.hard_ttl).unwrap_or_else(|_| chrono::Duration::zero());
        entry.server_name = result.server_name;
        entry.server_version = result.server_version;
        entry.server_description = result.description;

        if let Err(e) = self
            .kv
            .set(Self::kv_key(service.id), entry.clone(), self.hard_ttl)
            .await
        {
            warn!(service_id = service.id, "KV write failed: {}", e);
        }
        self.repo.upsert(&entry).await?;
        debug!(service_id = service.id, tools = entry.tools.len(), "tool cache refreshed");
        Ok(entry)
    }

    /// Drop a service's entries from both tiers
    pub async fn invalidate(&self, service_id: i32) -> Result<(), GatewayError> {
        let _ = self.kv.delete(&Self::kv_key(service_id)).await;
        self.repo.delete_by_service(service_id).await?;
        Ok(())
    }

    /// Delete relational rows past their hard expiry, returning the count
    pub async fn clean_expired(&self) -> Result<u64, GatewayError> {
        Ok(self.repo.clean_expired(Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toolgate_core::tool::ToolDefinition;
    use toolgate_storage::testing::connect_memory;

    struct CountingDiscovery {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl ToolDiscovery for CountingDiscovery {
        async fn discover(
            &self,
            _service: &Service,
            _timeout: Duration,
        ) -> crate::client::DiscoveryResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return crate::client::DiscoveryResult::failure("backend down");
            }
            crate::client::DiscoveryResult {
                success: true,
                server_name: "stub".into(),
                server_version: "1.0".into(),
                description: String::new(),
                tools: vec![ToolDefinition::new(
                    "search",
                    "",
                    serde_json::json!({"type":"object","properties":{}}),
                )],
                error: None,
            }
        }
    }

    async fn setup(
        delay: Duration,
        fail: bool,
    ) -> (ToolCacheService, ServiceRepository, Arc<CountingDiscovery>) {
        let db = connect_memory().await;
        let services = ServiceRepository::new(db.clone());
        let repo = ToolCacheRepository::new(db);
        let discovery = Arc::new(CountingDiscovery {
            calls: AtomicUsize::new(0),
            delay,
            fail,
        });
        let cache = ToolCacheService::new(
            repo,
            services.clone(),
            discovery.clone(),
            Duration::from_secs(1800),
            Duration::from_secs(86400),
            Duration::from_secs(5),
        );
        (cache, services, discovery)
    }

    fn stdio_service(name: &str) -> Service {
        Service {
            id: 0,
            name: name.into(),
            display_name: name.into(),
            description: String::new(),
            category: "custom".into(),
            sort: 0,
            enabled: true,
            service_type: ServiceType::Stdio,
            command: "npx".into(),
            args: vec![],
            cwd: String::new(),
            api_endpoint: String::new(),
            api_key_name: String::new(),
            api_key_ciphertext: String::new(),
            api_key_header: String::new(),
            api_key_prefix: String::new(),
            headers: HashMap::new(),
            env_defs: vec![],
            env_defaults: HashMap::new(),
            tools: vec![],
            rpd_limit: 0,
            mcp_enabled: false,
            access_token: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_api_bridge_short_circuits() {
        let (cache, services, discovery) = setup(Duration::ZERO, false).await;
        let mut svc = stdio_service("bridge");
        svc.service_type = ServiceType::ApiBridge;
        svc.tools = vec![ToolDefinition::new("search", "", serde_json::json!({}))];
        let svc = services.create(&svc).await.unwrap();

        let got = cache.get_service_tools(svc.id, false).await.unwrap();
        assert_eq!(got.entry.tools.len(), 1);
        assert!(!got.from_cache);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_miss_discovers_and_caches() {
        let (cache, services, discovery) = setup(Duration::ZERO, false).await;
        let svc = services.create(&stdio_service("s1")).await.unwrap();

        let first = cache.get_service_tools(svc.id, false).await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);

        // Fresh hit: no new discovery
        let second = cache.get_service_tools(svc.id, false).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_serves_and_refreshes_once() {
        let (cache, services, discovery) = setup(Duration::from_millis(50), false).await;
        let svc = services.create(&stdio_service("s2")).await.unwrap();

        // Seed a stale-but-usable entry straight into the cold tier
        let now = Utc::now();
        let mut entry = CachedServiceTools::new(svc.id, vec![], now);
        entry.cached_at = now - ChronoDuration::seconds(10);
        entry.soft_expiry = now - ChronoDuration::seconds(1);
        entry.hard_expiry = now + ChronoDuration::minutes(10);
        cache.repo.upsert(&entry).await.unwrap();

        // Two concurrent stale reads: both served from cache, one refresh
        let a = cache.get_service_tools(svc.id, false).await.unwrap();
        let b = cache.get_service_tools(svc.id, false).await.unwrap();
        assert!(a.from_cache);
        assert!(b.from_cache);
        assert!(a.entry.tools.is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);

        // The refresh overwrote the entry; still served as a cache hit
        let c = cache.get_service_tools(svc.id, false).await.unwrap();
        assert!(c.from_cache);
        assert!(c.entry.cached_at > entry.cached_at);
        assert_eq!(c.entry.tools.len(), 1);
    }

    #[tokio::test]
    async fn test_hard_expired_discovers_synchronously() {
        let (cache, services, discovery) = setup(Duration::ZERO, false).await;
        let svc = services.create(&stdio_service("s3")).await.unwrap();

        let now = Utc::now();
        let mut entry = CachedServiceTools::new(svc.id, vec![], now);
        entry.soft_expiry = now - ChronoDuration::hours(25);
        entry.hard_expiry = now - ChronoDuration::hours(1);
        cache.repo.upsert(&entry).await.unwrap();

        let got = cache.get_service_tools(svc.id, false).await.unwrap();
        assert!(!got.from_cache);
        assert_eq!(got.entry.tools.len(), 1);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_propagates_failure() {
        let (cache, services, _discovery) = setup(Duration::ZERO, true).await;
        let svc = services.create(&stdio_service("s4")).await.unwrap();

        let err = cache.get_service_tools(svc.id, true).await.unwrap_err();
        assert!(err.message().contains("backend down"));
    }

    #[tokio::test]
    async fn test_clean_expired() {
        let (cache, services, _discovery) = setup(Duration::ZERO, false).await;
        let svc = services.create(&stdio_service("s5")).await.unwrap();

        let now = Utc::now();
        let mut entry = CachedServiceTools::new(svc.id, vec![], now);
        entry.hard_expiry = now - ChronoDuration::seconds(1);
        cache.repo.upsert(&entry).await.unwrap();

        assert_eq!(cache.clean_expired().await.unwrap(), 1);
    }
}
