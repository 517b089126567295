//! Domain-driven configuration management for Toolgate
//!
//! Configuration is split by functional domain, each with serde defaults,
//! validation, and environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    cache::CacheConfig, database::DatabaseConfig, discovery::DiscoveryConfig,
    runtime::RuntimeConfig, server::ServerConfig, vault::VaultConfig, ToolgateConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
