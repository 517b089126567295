//! Backend discovery configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::utils::serde_duration;

/// Backend discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Per-request timeout for a discovery leg
    #[serde(with = "serde_duration", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Lowered per-request timeout used during bulk imports
    #[serde(with = "serde_duration", default = "default_import_timeout")]
    pub import_request_timeout: Duration,

    /// Concurrent discovery workers during bulk import
    #[serde(default = "default_import_workers")]
    pub import_workers: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            import_request_timeout: default_import_timeout(),
            import_workers: default_import_workers(),
        }
    }
}

impl Validatable for DiscoveryConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.import_workers == 0 {
            return Err(self.validation_error("import_workers must be greater than 0"));
        }
        if self.import_request_timeout > self.request_timeout {
            return Err(
                self.validation_error("import_request_timeout must not exceed request_timeout")
            );
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "discovery"
    }
}

// Default value functions
fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_import_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_import_workers() -> usize {
    5
}
