//! Command validation
//!
//! Two tiers: [`validate_command`] rejects obviously destructive commands
//! and arguments anywhere the installer runs something, while the
//! narrower [`validate_mcp_server_command`] accepts only the runtime
//! launchers a registered stdio backend may use.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RuntimeError, RuntimeResult};

/// Commands never executed regardless of arguments
const BLOCKED_COMMANDS: &[&str] = &[
    "shutdown", "reboot", "halt", "poweroff", "init", "rm", "rmdir", "dd", "mkfs", "fdisk",
    "parted", "sudo", "su", "doas", "chown", "chmod", "kill", "killall", "pkill", "sh", "bash",
    "zsh", "fish", "csh", "ksh", "dash", "eval", "exec", "source", "crontab", "systemctl",
    "service", "iptables", "nc", "ncat",
];

/// Launchers accepted for registered MCP stdio backends
const MCP_SERVER_COMMANDS: &[&str] = &[
    "npx", "npm", "node", "uvx", "uv", "python", "python3", "bunx", "bun", "deno",
];

/// Argument patterns that end validation immediately
static DANGEROUS_ARG_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Shell metacharacters: chaining, substitution, redirection
        r"[;&|`<>]",
        r"\$\(",
        // Environment-variable expansion
        r"\$\{?[A-Za-z_]",
        // Path traversal
        r"\.\./",
        // Null bytes
        r"\x00",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Paths no argument may reference
static SENSITIVE_PATH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"/etc/passwd",
        r"/etc/shadow",
        r"/etc/sudoers",
        r"(^|/)\.ssh(/|$)",
        r"(^|/)\.gnupg(/|$)",
        r"(^|/)\.aws/credentials",
        r"/proc/[^/]+/environ",
        r"(^|/)\.env($|\.)",
        r"/dev/(sd|nvme|mem)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Reject blocked commands and dangerous arguments
pub fn validate_command(command: &str, args: &[String]) -> RuntimeResult<()> {
    let name = base_name(command).to_lowercase();
    if name.is_empty() {
        return Err(RuntimeError::rejected("empty command"));
    }
    if BLOCKED_COMMANDS.contains(&name.as_str()) {
        return Err(RuntimeError::rejected(format!(
            "command '{}' is blocked",
            name
        )));
    }
    for arg in args {
        for pattern in DANGEROUS_ARG_PATTERNS.iter() {
            if pattern.is_match(arg) {
                return Err(RuntimeError::rejected(format!(
                    "argument '{}' contains a disallowed pattern",
                    arg
                )));
            }
        }
        for pattern in SENSITIVE_PATH_PATTERNS.iter() {
            if pattern.is_match(arg) {
                return Err(RuntimeError::rejected(format!(
                    "argument '{}' references a sensitive path",
                    arg
                )));
            }
        }
    }
    Ok(())
}

/// Accept only the known runtime launchers, then apply the general rules
pub fn validate_mcp_server_command(command: &str, args: &[String]) -> RuntimeResult<()> {
    let name = base_name(command).to_lowercase();
    if !MCP_SERVER_COMMANDS.contains(&name.as_str()) {
        return Err(RuntimeError::rejected(format!(
            "'{}' is not an allowed MCP server launcher",
            name
        )));
    }
    validate_command(command, args)
}

/// Final path component so `/usr/bin/npx` and `npx` validate alike
fn base_name(command: &str) -> &str {
    command
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(command)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blocked_commands() {
        assert!(validate_command("rm", &args(&["-rf", "x"])).is_err());
        assert!(validate_command("sudo", &args(&["ls"])).is_err());
        assert!(validate_command("/bin/bash", &args(&[])).is_err());
        assert!(validate_command("shutdown", &args(&[])).is_err());
    }

    #[test]
    fn test_dangerous_arguments() {
        assert!(validate_command("npx", &args(&["foo;ls"])).is_err());
        assert!(validate_command("npx", &args(&["$(whoami)"])).is_err());
        assert!(validate_command("npx", &args(&["$HOME/x"])).is_err());
        assert!(validate_command("npx", &args(&["../../etc"])).is_err());
        assert!(validate_command("npx", &args(&["a|b"])).is_err());
    }

    #[test]
    fn test_sensitive_paths() {
        assert!(validate_command("cat", &args(&["/etc/passwd"])).is_err());
        assert!(validate_command("node", &args(&["/home/u/.ssh/id_rsa"])).is_err());
        assert!(validate_command("node", &args(&["/proc/1/environ"])).is_err());
    }

    #[test]
    fn test_legitimate_commands_pass() {
        assert!(validate_command("npx", &args(&["-y", "@scope/server"])).is_ok());
        assert!(validate_command("uvx", &args(&["--from", "pkg", "server"])).is_ok());
        assert!(validate_command("docker", &args(&["run", "image"])).is_ok());
    }

    #[test]
    fn test_mcp_whitelist() {
        assert!(validate_mcp_server_command("npx", &args(&["-y", "pkg"])).is_ok());
        assert!(validate_mcp_server_command("/usr/local/bin/node", &args(&["server.js"])).is_ok());
        assert!(validate_mcp_server_command("docker", &args(&["run"])).is_err());
        assert!(validate_mcp_server_command("./server", &args(&[])).is_err());
        // Whitelisted launcher with a dangerous argument still fails
        assert!(validate_mcp_server_command("npx", &args(&["a;b"])).is_err());
    }
}
