//! Tool cache configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::utils::serde_duration;

/// Tool cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Soft expiry: entries older than this are stale but usable
    #[serde(with = "serde_duration", default = "default_soft_ttl")]
    pub soft_ttl: Duration,

    /// Hard expiry: entries older than this are treated as absent
    #[serde(with = "serde_duration", default = "default_hard_ttl")]
    pub hard_ttl: Duration,

    /// TTL of the short-lived service/group list caches
    #[serde(with = "serde_duration", default = "default_list_ttl")]
    pub list_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            soft_ttl: default_soft_ttl(),
            hard_ttl: default_hard_ttl(),
            list_ttl: default_list_ttl(),
        }
    }
}

impl Validatable for CacheConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.soft_ttl >= self.hard_ttl {
            return Err(self.validation_error("soft_ttl must be shorter than hard_ttl"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "cache"
    }
}

// Default value functions
fn default_soft_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_hard_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_list_ttl() -> Duration {
    Duration::from_secs(30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.soft_ttl, Duration::from_secs(1800));
        assert_eq!(config.hard_ttl, Duration::from_secs(86400));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_ttls_rejected() {
        let config = CacheConfig {
            soft_ttl: Duration::from_secs(100),
            hard_ttl: Duration::from_secs(50),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
