use std::collections::HashMap;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use toolgate_core::group::{service_ids_from_json, service_ids_to_json, ServiceGroup, ToolAliasMap};

/// Service-group entity.
///
/// `service_ids`, `weights` and `tool_aliases` are JSON text. The alias
/// column may still hold the legacy `{canonical:[aliases]}` shape; decoding
/// goes through [`ToolAliasMap::from_json`] which accepts both and the next
/// write emits the extended shape.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub enabled: bool,

    pub aggregation_enabled: bool,

    /// Bearer credential for the aggregation endpoint
    pub access_token: String,

    /// Ordered member ids as JSON text
    #[sea_orm(column_type = "Text")]
    pub service_ids: String,

    /// Per-service weights as JSON text
    #[sea_orm(column_type = "Text")]
    pub weights: String,

    /// Alias map as JSON text (extended shape on write)
    #[sea_orm(column_type = "Text")]
    pub tool_aliases: String,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn to_domain(&self) -> ServiceGroup {
        let weights: HashMap<i32, u32> = if self.weights.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&self.weights).unwrap_or_default()
        };
        ServiceGroup {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            aggregation_enabled: self.aggregation_enabled,
            access_token: self.access_token.clone(),
            service_ids: service_ids_from_json(&self.service_ids),
            weights,
            tool_aliases: ToolAliasMap::from_json(&self.tool_aliases),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn from_domain(group: &ServiceGroup) -> Self {
        Self {
            id: group.id,
            name: group.name.clone(),
            description: group.description.clone(),
            enabled: group.enabled,
            aggregation_enabled: group.aggregation_enabled,
            access_token: group.access_token.clone(),
            service_ids: service_ids_to_json(&group.service_ids),
            weights: serde_json::to_string(&group.weights)
                .unwrap_or_else(|_| "{}".to_string()),
            tool_aliases: group.tool_aliases.to_json(),
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}
