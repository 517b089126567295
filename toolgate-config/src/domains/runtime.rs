//! Runtime installer configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::utils::serde_duration;

/// Runtime installer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Persisted data directory for installed runtimes; expected to be a
    /// mounted volume. Overridden by `RUNTIME_DATA_DIR`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Proxy URL propagated to install commands, empty for none
    #[serde(default)]
    pub proxy_url: String,

    /// Timeout for runtime and package installs
    #[serde(with = "serde_duration", default = "default_install_timeout")]
    pub install_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            proxy_url: String::new(),
            install_timeout: default_install_timeout(),
        }
    }
}

impl Validatable for RuntimeConfig {
    fn validate(&self) -> ConfigResult<()> {
        crate::validation::validate_required_string(&self.data_dir, "data_dir", self.domain_name())?;
        if !self.proxy_url.is_empty() {
            crate::validation::validate_url(&self.proxy_url, "proxy_url", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runtime"
    }
}

// Default value functions
fn default_data_dir() -> String {
    "/app/data/runtimes".to_string()
}

fn default_install_timeout() -> Duration {
    Duration::from_secs(600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_config_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.data_dir, "/app/data/runtimes");
        assert_eq!(config.install_timeout, Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_proxy_url_rejected() {
        let config = RuntimeConfig {
            proxy_url: "not a url".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
