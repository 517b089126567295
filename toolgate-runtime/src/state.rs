//! Persisted installer state
//!
//! `runtime_state.json` records which runtimes and packages have been
//! installed into the data directory. It is rewritten atomically (temp
//! file + rename in the same directory) under the install mutex after
//! every successful change.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RuntimeResult;
use crate::kind::RuntimeKind;

/// One installed runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledRuntime {
    pub installed: bool,
    #[serde(default)]
    pub version: String,
    pub install_path: String,
    pub installed_at: DateTime<Utc>,
}

/// One installed package, keyed as `"{kind}:{package}"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub runtime_type: RuntimeKind,
    pub install_command: String,
    pub installed_at: DateTime<Utc>,
}

/// Full state file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    #[serde(default)]
    pub runtimes: HashMap<String, InstalledRuntime>,
    #[serde(default)]
    pub packages: HashMap<String, InstalledPackage>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl RuntimeState {
    /// Key used in the packages map
    pub fn package_key(kind: RuntimeKind, package: &str) -> String {
        format!("{}:{}", kind, package)
    }

    pub fn is_runtime_installed(&self, kind: RuntimeKind) -> bool {
        self.runtimes
            .get(kind.as_str())
            .map(|r| r.installed)
            .unwrap_or(false)
    }

    /// Load the state file; a missing file is an empty state
    pub fn load(path: &Path) -> RuntimeResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist atomically: write a sibling temp file, then rename over the
    /// target so a crash never leaves a truncated state file.
    pub fn save(&mut self, path: &Path) -> RuntimeResult<()> {
        self.last_updated = Some(Utc::now());
        let text = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Drop a runtime and every package installed under it
    pub fn remove_runtime(&mut self, kind: RuntimeKind) {
        self.runtimes.remove(kind.as_str());
        let prefix = format!("{}:", kind);
        self.packages.retain(|key, _| !key.starts_with(&prefix));
    }
}
