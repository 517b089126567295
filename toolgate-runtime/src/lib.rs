//! # Toolgate Runtime
//!
//! On-demand provisioning of the execution environments stdio backends
//! need (Node, Python, Bun, Deno), plus the safety rails around every
//! subprocess the gateway spawns: command whitelisting, dangerous-argument
//! rejection, sensitive-environment filtering, scoped timeouts, and
//! process-group isolation so a runaway backend never signals the
//! gateway.
//!
//! Installed state persists in `runtime_state.json` under the runtime
//! data directory (expected to be a mounted volume) and is rewritten
//! atomically after every successful install or uninstall.

pub mod command;
pub mod env;
pub mod error;
pub mod installer;
pub mod kind;
pub mod process;
pub mod state;

pub use command::{validate_command, validate_mcp_server_command};
pub use env::{filter_sensitive_env_vars, get_safe_env_for_mcp};
pub use error::{RuntimeError, RuntimeResult};
pub use installer::RuntimeInstaller;
pub use kind::{detect_runtime_kind, RuntimeKind};
pub use process::{kill_process_group, SecureCommand};

use std::time::Duration;

/// Default timeout for a spawned command
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Timeout for MCP discovery subprocesses
pub const MCP_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for runtime and package installs
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(10 * 60);
