use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use toolgate_core::service::{EnvVarDef, Service, ServiceType};
use toolgate_core::tool::{tools_from_json, tools_to_json};

/// Service entity: one registered backend.
///
/// Collection attributes (args, headers, env definitions, tools) are JSON
/// text for backend portability. The numeric id is the stable key used in
/// MCP endpoint paths; `name` is deliberately not unique.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    /// Primary key, exposed in MCP endpoint paths
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Short name, letter-leading, duplicates auto-renamed on create
    pub name: String,

    pub display_name: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Category tag from the closed set
    pub category: String,

    /// Admin-facing sort order
    pub sort: i32,

    pub enabled: bool,

    /// `stdio` | `sse` | `streamable_http` | `api_bridge`
    pub service_type: String,

    /// Executable for stdio services
    pub command: String,

    /// Argument vector as JSON text
    #[sea_orm(column_type = "Text")]
    pub args: String,

    /// Working directory for stdio services
    pub cwd: String,

    /// Endpoint for api_bridge/sse/streamable_http services
    pub api_endpoint: String,

    pub api_key_name: String,

    /// Encrypted credential; never leaves the storage/vault boundary
    #[sea_orm(column_type = "Text")]
    pub api_key_ciphertext: String,

    pub api_key_header: String,

    pub api_key_prefix: String,

    /// Custom headers as JSON text
    #[sea_orm(column_type = "Text")]
    pub headers: String,

    /// Required env-var definitions as JSON text
    #[sea_orm(column_type = "Text")]
    pub env_defs: String,

    /// Default env values as JSON text
    #[sea_orm(column_type = "Text")]
    pub env_defaults: String,

    /// Tool definitions as JSON text
    #[sea_orm(column_type = "Text")]
    pub tools: String,

    /// Requests-per-day limit, 0 = unlimited
    pub rpd_limit: i32,

    pub mcp_enabled: bool,

    /// Bearer credential for the per-service MCP endpoint
    pub access_token: String,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Convert a row into the domain type, tolerating malformed JSON text
    /// in collection columns (decoded as empty).
    pub fn to_domain(&self) -> Service {
        Service {
            id: self.id,
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            sort: self.sort,
            enabled: self.enabled,
            service_type: ServiceType::parse(&self.service_type)
                .unwrap_or(ServiceType::Stdio),
            command: self.command.clone(),
            args: decode_or_default(&self.args),
            cwd: self.cwd.clone(),
            api_endpoint: self.api_endpoint.clone(),
            api_key_name: self.api_key_name.clone(),
            api_key_ciphertext: self.api_key_ciphertext.clone(),
            api_key_header: self.api_key_header.clone(),
            api_key_prefix: self.api_key_prefix.clone(),
            headers: decode_or_default(&self.headers),
            env_defs: decode_env_defs(&self.env_defs),
            env_defaults: decode_or_default(&self.env_defaults),
            tools: tools_from_json(&self.tools),
            rpd_limit: self.rpd_limit,
            mcp_enabled: self.mcp_enabled,
            access_token: self.access_token.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Build a row from the domain type (id ignored for inserts)
    pub fn from_domain(service: &Service) -> Self {
        Self {
            id: service.id,
            name: service.name.clone(),
            display_name: service.display_name.clone(),
            description: service.description.clone(),
            category: service.category.clone(),
            sort: service.sort,
            enabled: service.enabled,
            service_type: service.service_type.as_str().to_string(),
            command: service.command.clone(),
            args: encode_or_empty(&service.args, "[]"),
            cwd: service.cwd.clone(),
            api_endpoint: service.api_endpoint.clone(),
            api_key_name: service.api_key_name.clone(),
            api_key_ciphertext: service.api_key_ciphertext.clone(),
            api_key_header: service.api_key_header.clone(),
            api_key_prefix: service.api_key_prefix.clone(),
            headers: encode_or_empty(&service.headers, "{}"),
            env_defs: encode_or_empty(&service.env_defs, "[]"),
            env_defaults: encode_or_empty(&service.env_defaults, "{}"),
            tools: tools_to_json(&service.tools),
            rpd_limit: service.rpd_limit,
            mcp_enabled: service.mcp_enabled,
            access_token: service.access_token.clone(),
            created_at: service.created_at,
            updated_at: service.updated_at,
        }
    }
}

fn decode_or_default<T: serde::de::DeserializeOwned + Default>(text: &str) -> T {
    if text.trim().is_empty() {
        return T::default();
    }
    serde_json::from_str(text).unwrap_or_default()
}

fn decode_env_defs(text: &str) -> Vec<EnvVarDef> {
    decode_or_default(text)
}

fn encode_or_empty<T: Serialize>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
}
