//! Group management

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::info;

use toolgate_core::group::{ServiceGroup, ToolAliasMap};
use toolgate_core::{GatewayError, GatewayResult};
use toolgate_storage::{GroupRepository, ListPage, ListQuery, ServiceRepository};

use crate::token::mint_access_token;

/// Input for creating a group
#[derive(Debug, Clone, Default)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub service_ids: Vec<i32>,
    pub weights: HashMap<i32, u32>,
    pub tool_aliases: ToolAliasMap,
    pub aggregation_enabled: bool,
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateGroup {
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub aggregation_enabled: Option<bool>,
    pub service_ids: Option<Vec<i32>>,
    pub weights: Option<HashMap<i32, u32>>,
    pub tool_aliases: Option<ToolAliasMap>,
}

/// Administrative group management
pub struct GroupRegistry {
    groups: GroupRepository,
    services: ServiceRepository,
    list_cache: Mutex<Option<(Instant, Vec<ServiceGroup>)>>,
    list_ttl: Duration,
}

impl GroupRegistry {
    pub fn new(
        groups: GroupRepository,
        services: ServiceRepository,
        list_ttl: Duration,
    ) -> Self {
        Self {
            groups,
            services,
            list_cache: Mutex::new(None),
            list_ttl,
        }
    }

    fn invalidate_list_cache(&self) {
        *self.list_cache.lock() = None;
    }

    /// Member ids must exist and must not repeat; weights are floored ≥ 1
    async fn validate_members(
        &self,
        service_ids: &[i32],
        weights: &HashMap<i32, u32>,
    ) -> GatewayResult<()> {
        let mut seen = std::collections::HashSet::new();
        for id in service_ids {
            if !seen.insert(*id) {
                return Err(GatewayError::validation(format!(
                    "duplicate service id {} in group",
                    id
                )));
            }
        }
        let found = self.services.find_by_ids(service_ids).await?;
        if found.len() != service_ids.len() {
            let found_ids: std::collections::HashSet<i32> =
                found.iter().map(|s| s.id).collect();
            let missing: Vec<String> = service_ids
                .iter()
                .filter(|id| !found_ids.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(GatewayError::validation(format!(
                "unknown service id(s): {}",
                missing.join(", ")
            )));
        }
        if weights.values().any(|w| *w == 0) {
            return Err(GatewayError::validation("weights must be at least 1"));
        }
        Ok(())
    }

    pub async fn create(&self, input: NewGroup) -> GatewayResult<ServiceGroup> {
        if input.name.is_empty() {
            return Err(GatewayError::validation("group name must not be empty"));
        }
        if self.groups.find_by_name(&input.name).await?.is_some() {
            return Err(GatewayError::conflict(format!(
                "group '{}' already exists",
                input.name
            )));
        }
        self.validate_members(&input.service_ids, &input.weights)
            .await?;

        let now = Utc::now();
        let group = ServiceGroup {
            id: 0,
            name: input.name,
            description: input.description,
            enabled: true,
            aggregation_enabled: input.aggregation_enabled,
            access_token: mint_access_token()?,
            service_ids: input.service_ids,
            weights: input.weights,
            tool_aliases: input.tool_aliases,
            created_at: now,
            updated_at: now,
        };
        let created = self.groups.create(&group).await?;
        self.invalidate_list_cache();
        info!(id = created.id, name = %created.name, "group created");
        Ok(created)
    }

    pub async fn get(&self, id: i32) -> GatewayResult<ServiceGroup> {
        self.groups
            .find_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::not_found(format!("group {}", id)))
    }

    pub async fn get_by_name(&self, name: &str) -> GatewayResult<ServiceGroup> {
        self.groups
            .find_by_name(name)
            .await?
            .ok_or_else(|| GatewayError::group_not_found(name))
    }

    /// All groups, served from the short-lived cache when fresh
    pub async fn list_all(&self) -> GatewayResult<Vec<ServiceGroup>> {
        {
            let cache = self.list_cache.lock();
            if let Some((at, groups)) = cache.as_ref() {
                if at.elapsed() < self.list_ttl {
                    return Ok(groups.clone());
                }
            }
        }
        let groups = self.groups.find_all().await?;
        {
            let mut cache = self.list_cache.lock();
            if cache
                .as_ref()
                .map(|(at, _)| at.elapsed() >= self.list_ttl)
                .unwrap_or(true)
            {
                *cache = Some((Instant::now(), groups.clone()));
            }
        }
        Ok(groups)
    }

    pub async fn list(&self, query: &ListQuery) -> GatewayResult<ListPage<ServiceGroup>> {
        Ok(self.groups.list(query).await?)
    }

    pub async fn update(&self, id: i32, patch: UpdateGroup) -> GatewayResult<ServiceGroup> {
        let mut group = self.get(id).await?;

        if let Some(v) = patch.description {
            group.description = v;
        }
        if let Some(v) = patch.enabled {
            group.enabled = v;
        }
        if let Some(v) = patch.aggregation_enabled {
            group.aggregation_enabled = v;
        }
        if let Some(v) = patch.service_ids {
            group.service_ids = v;
        }
        if let Some(v) = patch.weights {
            group.weights = v;
        }
        if let Some(v) = patch.tool_aliases {
            group.tool_aliases = v;
        }
        self.validate_members(&group.service_ids, &group.weights)
            .await?;
        group.updated_at = Utc::now();

        let updated = self.groups.update(&group).await?;
        self.invalidate_list_cache();
        Ok(updated)
    }

    pub async fn regenerate_token(&self, id: i32) -> GatewayResult<String> {
        let mut group = self.get(id).await?;
        group.access_token = mint_access_token()?;
        group.updated_at = Utc::now();
        self.groups.update(&group).await?;
        self.invalidate_list_cache();
        Ok(group.access_token)
    }

    /// Delete the group; member services stay untouched
    pub async fn delete(&self, id: i32) -> GatewayResult<()> {
        self.groups.delete(id).await?;
        self.invalidate_list_cache();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate_storage::testing::connect_memory;

    async fn setup() -> (GroupRegistry, ServiceRepository) {
        let db = connect_memory().await;
        let services = ServiceRepository::new(db.clone());
        let registry = GroupRegistry::new(
            GroupRepository::new(db),
            services.clone(),
            Duration::from_secs(30),
        );
        (registry, services)
    }

    async fn seed_service(services: &ServiceRepository, name: &str) -> i32 {
        use std::collections::HashMap as Map;
        let svc = toolgate_core::service::Service {
            id: 0,
            name: name.into(),
            display_name: name.into(),
            description: String::new(),
            category: "custom".into(),
            sort: 0,
            enabled: true,
            service_type: toolgate_core::service::ServiceType::Stdio,
            command: "npx".into(),
            args: vec![],
            cwd: String::new(),
            api_endpoint: String::new(),
            api_key_name: String::new(),
            api_key_ciphertext: String::new(),
            api_key_header: String::new(),
            api_key_prefix: String::new(),
            headers: Map::new(),
            env_defs: vec![],
            env_defaults: Map::new(),
            tools: vec![],
            rpd_limit: 0,
            mcp_enabled: false,
            access_token: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        services.create(&svc).await.unwrap().id
    }

    #[tokio::test]
    async fn test_create_mints_token_and_validates_members() {
        let (registry, services) = setup().await;
        let id = seed_service(&services, "one").await;

        let created = registry
            .create(NewGroup {
                name: "prod".into(),
                service_ids: vec![id],
                aggregation_enabled: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.access_token.len(), 32);

        // Unknown member
        let err = registry
            .create(NewGroup {
                name: "bad".into(),
                service_ids: vec![9999],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.message().contains("9999"));

        // Duplicate member
        let err = registry
            .create(NewGroup {
                name: "dup".into(),
                service_ids: vec![id, id],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.message().contains("duplicate"));

        // Duplicate group name
        let err = registry
            .create(NewGroup {
                name: "prod".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), toolgate_core::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_zero_weight_rejected() {
        let (registry, services) = setup().await;
        let id = seed_service(&services, "one").await;
        let mut weights = HashMap::new();
        weights.insert(id, 0u32);

        let err = registry
            .create(NewGroup {
                name: "g".into(),
                service_ids: vec![id],
                weights,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.message().contains("at least 1"));
    }

    #[tokio::test]
    async fn test_delete_leaves_services() {
        let (registry, services) = setup().await;
        let id = seed_service(&services, "kept").await;
        let group = registry
            .create(NewGroup {
                name: "g".into(),
                service_ids: vec![id],
                ..Default::default()
            })
            .await
            .unwrap();

        registry.delete(group.id).await.unwrap();
        assert!(services.find_by_id(id).await.unwrap().is_some());
    }
}
