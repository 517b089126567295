//! Secure subprocess creation and process-group control
//!
//! Every spawn goes through [`SecureCommand`]: validated command, filtered
//! environment, scoped timeout, and (on Unix) a fresh process group so
//! signals aimed at the child never reach the gateway. Windows has no
//! PGID semantics; teardown falls back to `taskkill /F /T`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::env::get_safe_env_for_mcp;
use crate::error::{RuntimeError, RuntimeResult};

/// Builder for a validated, isolated subprocess
pub struct SecureCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    extra_env: HashMap<String, String>,
    timeout: Duration,
    piped: bool,
}

impl SecureCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            extra_env: HashMap::new(),
            timeout: crate::DEFAULT_COMMAND_TIMEOUT,
            piped: false,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.insert(name.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: &HashMap<String, String>) -> Self {
        self.extra_env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pipe stdin/stdout/stderr (stdio MCP transport needs all three)
    pub fn piped(mut self) -> Self {
        self.piped = true;
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    /// Spawn the process with a cleared-then-refilled environment and
    /// process-group isolation.
    pub fn spawn(&self) -> RuntimeResult<Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.env_clear();
        for (name, value) in get_safe_env_for_mcp(&self.extra_env) {
            cmd.env(name, value);
        }
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        if self.piped {
            cmd.stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }
        cmd.kill_on_drop(true);
        apply_process_isolation(&mut cmd);

        debug!(program = %self.program, "spawning subprocess");
        cmd.spawn().map_err(|e| RuntimeError::Spawn {
            details: format!("{}: {}", self.program, e),
        })
    }

    /// Run to completion under the configured timeout, returning
    /// `(status, stdout, stderr)`. On timeout the whole process group is
    /// killed before the error returns.
    pub async fn run(&self) -> RuntimeResult<(std::process::ExitStatus, String, String)> {
        let child = self.spawn()?;
        let pid = child.id();

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| RuntimeError::Spawn {
                details: e.to_string(),
            })?,
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                return Err(RuntimeError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        Ok((
            output.status,
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }
}

/// Put the child in its own process group (Unix). No-op elsewhere.
#[cfg(unix)]
fn apply_process_isolation(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn apply_process_isolation(_cmd: &mut Command) {}

/// Kill the child's whole process group: `SIGKILL` to the negated PGID on
/// Unix, `taskkill /F /T /PID` on Windows. Best-effort; failures are
/// logged and swallowed because the child may already be gone.
#[cfg(unix)]
pub fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        warn!(pid, "killpg failed: {}", e);
    }
}

#[cfg(windows)]
pub fn kill_process_group(pid: u32) {
    let result = std::process::Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .output();
    if let Err(e) = result {
        warn!(pid, "taskkill failed: {}", e);
    }
}

#[cfg(not(any(unix, windows)))]
pub fn kill_process_group(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_output() {
        let (status, stdout, _stderr) = SecureCommand::new("/bin/echo")
            .args(["hello"])
            .timeout(Duration::from_secs(5))
            .run()
            .await
            .unwrap();
        assert!(status.success());
        assert_eq!(stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let err = SecureCommand::new("/bin/sleep")
            .args(["30"])
            .timeout(Duration::from_millis(100))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let err = SecureCommand::new("/definitely/not/here")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn { .. }));
    }
}
