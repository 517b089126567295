//! Secret vault configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Secret vault configuration.
///
/// An empty key selects the identity vault; stored credentials stay in
/// plaintext. Deployments set `ENCRYPTION_KEY` to opt into AES-GCM.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VaultConfig {
    /// Symmetric key material; empty means identity mode
    #[serde(default)]
    pub encryption_key: String,
}

impl Validatable for VaultConfig {
    fn validate(&self) -> ConfigResult<()> {
        // Any key string is usable: shorter or longer keys are hashed to
        // 32 bytes by the vault. Nothing to reject.
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "vault"
    }
}
