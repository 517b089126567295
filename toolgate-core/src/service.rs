//! Registered backend services

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::tool::ToolDefinition;
use crate::MAX_SERVICE_NAME_LEN;

/// Transport type of a registered service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Local subprocess speaking MCP over stdin/stdout
    Stdio,
    /// Remote MCP server over Server-Sent Events
    Sse,
    /// Remote MCP server over bidirectional chunked HTTP
    StreamableHttp,
    /// REST endpoint wrapped with a predeclared tool schema
    ApiBridge,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Stdio => "stdio",
            ServiceType::Sse => "sse",
            ServiceType::StreamableHttp => "streamable_http",
            ServiceType::ApiBridge => "api_bridge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stdio" => Some(ServiceType::Stdio),
            "sse" => Some(ServiceType::Sse),
            "streamable_http" => Some(ServiceType::StreamableHttp),
            "api_bridge" => Some(ServiceType::ApiBridge),
            _ => None,
        }
    }

    /// Whether discovery opens a live MCP session for this type
    pub fn is_live_mcp(&self) -> bool {
        !matches!(self, ServiceType::ApiBridge)
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of an environment variable a stdio backend requires
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvVarDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub default: Option<String>,
}

/// A registered backend service.
///
/// The numeric id is the stable key: it appears in MCP endpoint paths, so
/// short names are allowed to collide (duplicates are auto-renamed on
/// create, but nothing depends on uniqueness).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: i32,

    /// Short name: letter-leading, letters/digits/`-`/`_`, not unique
    pub name: String,

    pub display_name: String,

    #[serde(default)]
    pub description: String,

    /// One of the closed category tags, see [`crate::category`]
    pub category: String,

    /// Admin-facing ordering
    #[serde(default)]
    pub sort: i32,

    pub enabled: bool,

    pub service_type: ServiceType,

    // stdio fields
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: String,

    // api_bridge / sse / streamable_http fields
    #[serde(default)]
    pub api_endpoint: String,
    #[serde(default)]
    pub api_key_name: String,
    /// Encrypted credential; never serialized outward
    #[serde(skip_serializing, default)]
    pub api_key_ciphertext: String,
    #[serde(default)]
    pub api_key_header: String,
    #[serde(default)]
    pub api_key_prefix: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Declarations of env vars the backend requires
    #[serde(default)]
    pub env_defs: Vec<EnvVarDef>,
    /// Default values applied when the caller supplies nothing
    #[serde(default)]
    pub env_defaults: HashMap<String, String>,

    #[serde(default)]
    pub tools: Vec<ToolDefinition>,

    /// Requests-per-day limit, 0 = unlimited
    #[serde(default)]
    pub rpd_limit: i32,

    /// Whether the per-service MCP endpoint is exposed
    #[serde(default)]
    pub mcp_enabled: bool,

    /// Bearer credential for the MCP endpoint; non-empty iff mcp_enabled
    #[serde(default)]
    pub access_token: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// Find a declared tool by name
    pub fn find_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }
}

/// Validate a service short name: non-empty, ≤255 chars, letter-leading,
/// restricted to letters/digits/`-`/`_`.
pub fn validate_service_name(name: &str) -> Result<(), GatewayError> {
    if name.is_empty() {
        return Err(GatewayError::validation("service name must not be empty"));
    }
    if name.len() > MAX_SERVICE_NAME_LEN {
        return Err(GatewayError::validation(format!(
            "service name exceeds {} characters",
            MAX_SERVICE_NAME_LEN
        )));
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap_or(' ');
    if !first.is_ascii_alphabetic() {
        return Err(GatewayError::validation(
            "service name must start with a letter",
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(GatewayError::validation(
            "service name may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}
