use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use toolgate_core::cache::CachedServiceTools;
use toolgate_core::tool::{tools_from_json, tools_to_json};

/// Cold-tier tool cache entry, one row per service.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tool_cache")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub service_id: i32,

    /// Discovered tools as JSON text
    #[sea_orm(column_type = "Text")]
    pub tools: String,

    pub server_name: String,

    pub server_version: String,

    #[sea_orm(column_type = "Text")]
    pub server_description: String,

    pub cached_at: ChronoDateTimeUtc,

    /// Stale-but-usable boundary
    pub soft_expiry: ChronoDateTimeUtc,

    /// Absent boundary: rows past this are refetched synchronously
    pub hard_expiry: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn to_domain(&self) -> CachedServiceTools {
        CachedServiceTools {
            service_id: self.service_id,
            tools: tools_from_json(&self.tools),
            server_name: self.server_name.clone(),
            server_version: self.server_version.clone(),
            server_description: self.server_description.clone(),
            cached_at: self.cached_at,
            soft_expiry: self.soft_expiry,
            hard_expiry: self.hard_expiry,
        }
    }

    pub fn from_domain(entry: &CachedServiceTools) -> Self {
        Self {
            id: 0,
            service_id: entry.service_id,
            tools: tools_to_json(&entry.tools),
            server_name: entry.server_name.clone(),
            server_version: entry.server_version.clone(),
            server_description: entry.server_description.clone(),
            cached_at: entry.cached_at,
            soft_expiry: entry.soft_expiry,
            hard_expiry: entry.hard_expiry,
        }
    }
}
