//! Configuration loading and environment variable handling

use crate::domains::ToolgateConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with the default prefix
    pub fn new() -> Self {
        Self {
            prefix: "TOOLGATE".to_string(),
        }
    }

    /// Create a new config loader with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<ToolgateConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ToolgateConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<ToolgateConfig> {
        let mut config = ToolgateConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<ToolgateConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut ToolgateConfig) -> ConfigResult<()> {
        if let Ok(host) = self.get_env_var("SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = self.get_env_var("SERVER_PORT") {
            config.server.port = port.parse().map_err(|e| {
                ConfigError::EnvError(format!("invalid SERVER_PORT: {}", e))
            })?;
        }
        if let Ok(url) = self.get_env_var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(secs) = self.get_env_var("DISCOVERY_TIMEOUT_SECONDS") {
            let secs: u64 = secs.parse().map_err(|e| {
                ConfigError::EnvError(format!("invalid DISCOVERY_TIMEOUT_SECONDS: {}", e))
            })?;
            config.discovery.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(proxy) = self.get_env_var("PROXY_URL") {
            config.runtime.proxy_url = proxy;
        }

        // Documented un-prefixed variables kept for compatibility with the
        // deployment surface: ENCRYPTION_KEY and RUNTIME_DATA_DIR.
        if let Ok(key) = std::env::var("ENCRYPTION_KEY") {
            config.vault.encryption_key = key;
        }
        if let Ok(dir) = std::env::var("RUNTIME_DATA_DIR") {
            if !dir.is_empty() {
                config.runtime.data_dir = dir;
            }
        }

        Ok(())
    }

    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: 127.0.0.1
  port: 8080
cache:
  soft_ttl: 60
  hard_ttl: 3600
"#
        )
        .unwrap();

        let config = ConfigLoader::with_prefix("TOOLGATE_TEST_NOPE")
            .from_file(file.path())
            .unwrap();
        assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.cache.soft_ttl, Duration::from_secs(60));
        // Unset domains keep their defaults
        assert_eq!(config.discovery.import_workers, 5);
    }

    #[test]
    fn test_defaults_validate() {
        // No config file, no env: defaults must be self-consistent
        let config = ToolgateConfig::default();
        assert!(config.validate_all().is_ok());
    }
}
