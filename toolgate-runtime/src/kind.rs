//! Runtime kinds and detection

use serde::{Deserialize, Serialize};

/// Execution environments a stdio backend may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    Nodejs,
    Python,
    Bun,
    Deno,
    /// Host-provided only, never installed by the gateway
    Docker,
    Custom,
}

impl RuntimeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeKind::Nodejs => "nodejs",
            RuntimeKind::Python => "python",
            RuntimeKind::Bun => "bun",
            RuntimeKind::Deno => "deno",
            RuntimeKind::Docker => "docker",
            RuntimeKind::Custom => "custom",
        }
    }

    /// Whether the installer knows how to provision this kind
    pub fn is_installable(&self) -> bool {
        !matches!(self, RuntimeKind::Docker | RuntimeKind::Custom)
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the runtime a command requires by exact (lowercased) match
pub fn detect_runtime_kind(command: &str) -> RuntimeKind {
    match command.to_lowercase().as_str() {
        "npx" | "npm" | "node" => RuntimeKind::Nodejs,
        "uvx" | "uv" | "python" | "python3" | "pip" | "pip3" => RuntimeKind::Python,
        "bunx" | "bun" => RuntimeKind::Bun,
        "deno" => RuntimeKind::Deno,
        "docker" => RuntimeKind::Docker,
        _ => RuntimeKind::Custom,
    }
}
