//! Domain-specific configuration modules

pub mod cache;
pub mod database;
pub mod discovery;
pub mod runtime;
pub mod server;
pub mod utils;
pub mod vault;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Toolgate configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ToolgateConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: server::ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: database::DatabaseConfig,

    /// Secret vault configuration
    #[serde(default)]
    pub vault: vault::VaultConfig,

    /// Runtime installer configuration
    #[serde(default)]
    pub runtime: runtime::RuntimeConfig,

    /// Backend discovery configuration
    #[serde(default)]
    pub discovery: discovery::DiscoveryConfig,

    /// Tool cache configuration
    #[serde(default)]
    pub cache: cache::CacheConfig,
}

impl ToolgateConfig {
    /// Validate all configuration domains
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.database.validate()?;
        self.vault.validate()?;
        self.runtime.validate()?;
        self.discovery.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}
