//! On-demand runtime installation
//!
//! The installer owns the runtime data directory and its state file. All
//! installs serialise on one mutex; the ensure-installed protocol is
//! fast-path lookup, lock, re-check, base-runtime install, package
//! install, verify. Install scripts are gateway-owned templates executed
//! through the shell; the command whitelists in [`crate::command`] apply
//! to registered service commands, not to these templates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::kind::{detect_runtime_kind, RuntimeKind};
use crate::process::SecureCommand;
use crate::state::{InstalledPackage, InstalledRuntime, RuntimeState};
use crate::INSTALL_TIMEOUT;

/// Host distribution flavor, decides which install script template runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFlavor {
    Alpine,
    Debian,
}

/// Runtime installer. One instance per process, passed by `Arc` through
/// construction rather than global state.
pub struct RuntimeInstaller {
    data_dir: PathBuf,
    state_path: PathBuf,
    proxy_url: String,
    /// Serialises every install/uninstall/upgrade
    install_lock: Mutex<()>,
}

impl RuntimeInstaller {
    pub fn new(data_dir: impl Into<PathBuf>, proxy_url: impl Into<String>) -> Self {
        let data_dir = data_dir.into();
        let state_path = data_dir.join("runtime_state.json");
        Self {
            data_dir,
            state_path,
            proxy_url: proxy_url.into(),
            install_lock: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Current persisted state
    pub fn state(&self) -> RuntimeResult<RuntimeState> {
        RuntimeState::load(&self.state_path)
    }

    /// Ensure `command` is runnable, installing its runtime and package on
    /// first use.
    pub async fn ensure_installed(&self, command: &str, args: &[String]) -> RuntimeResult<()> {
        // Fast path: already on PATH or in a managed bin directory
        if self.find_command(command).is_some() {
            return Ok(());
        }

        let _guard = self.install_lock.lock().await;

        // Re-check under the lock: another task may have just installed it
        if self.find_command(command).is_some() {
            return Ok(());
        }

        let kind = detect_runtime_kind(command);
        if !kind.is_installable() {
            return Err(RuntimeError::NotInstallable { kind });
        }

        let mut state = RuntimeState::load(&self.state_path)?;
        if !state.is_runtime_installed(kind) {
            self.install_runtime_locked(kind, &mut state).await?;
        }

        if let Some((package, install_command)) = generate_install_command(command, args) {
            info!(%kind, package, "installing package");
            self.run_shell(&install_command, INSTALL_TIMEOUT).await?;
            state.packages.insert(
                RuntimeState::package_key(kind, &package),
                InstalledPackage {
                    name: package,
                    runtime_type: kind,
                    install_command,
                    installed_at: Utc::now(),
                },
            );
            state.save(&self.state_path)?;
        }

        if self.find_command(command).is_none() {
            return Err(RuntimeError::StillMissing {
                command: command.to_string(),
            });
        }
        Ok(())
    }

    /// Remove a runtime directory and its state entries
    pub async fn uninstall(&self, kind: RuntimeKind) -> RuntimeResult<()> {
        let _guard = self.install_lock.lock().await;
        self.uninstall_locked(kind).await
    }

    /// Uninstall + reinstall under one lock acquisition
    pub async fn upgrade(&self, kind: RuntimeKind) -> RuntimeResult<()> {
        let _guard = self.install_lock.lock().await;
        self.uninstall_locked(kind).await?;
        let mut state = RuntimeState::load(&self.state_path)?;
        self.install_runtime_locked(kind, &mut state).await
    }

    async fn uninstall_locked(&self, kind: RuntimeKind) -> RuntimeResult<()> {
        let dir = self.data_dir.join(kind.as_str());
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        let mut state = RuntimeState::load(&self.state_path)?;
        state.remove_runtime(kind);
        state.save(&self.state_path)?;
        info!(%kind, "runtime uninstalled");
        Ok(())
    }

    /// Install the base runtime. Caller holds the install lock.
    async fn install_runtime_locked(
        &self,
        kind: RuntimeKind,
        state: &mut RuntimeState,
    ) -> RuntimeResult<()> {
        if !kind.is_installable() {
            return Err(RuntimeError::NotInstallable { kind });
        }
        let flavor = detect_os_flavor();
        let script = install_script(kind, flavor);
        info!(%kind, ?flavor, "installing runtime");

        let (status, _stdout, stderr) = self.run_shell(script, INSTALL_TIMEOUT).await?;
        if !status.success() {
            return Err(RuntimeError::InstallFailed {
                kind,
                details: stderr.lines().last().unwrap_or("install script failed").to_string(),
            });
        }

        let version = self.detect_version(kind).await.unwrap_or_default();
        state.runtimes.insert(
            kind.as_str().to_string(),
            InstalledRuntime {
                installed: true,
                version,
                install_path: self.data_dir.join(kind.as_str()).display().to_string(),
                installed_at: Utc::now(),
            },
        );
        state.save(&self.state_path)?;
        Ok(())
    }

    /// Run a script via the platform shell with the proxy and managed-bin
    /// environment applied.
    async fn run_shell(
        &self,
        script: &str,
        timeout: Duration,
    ) -> RuntimeResult<(std::process::ExitStatus, String, String)> {
        let mut cmd = if cfg!(windows) {
            SecureCommand::new("powershell").args(["-NoProfile", "-Command", script])
        } else {
            SecureCommand::new("sh").args(["-c", script])
        };
        cmd = cmd.timeout(timeout).envs(&self.install_env());
        cmd.run().await
    }

    /// Environment for install commands: proxy variables in both cases
    /// plus the per-runtime install prefixes under the data directory.
    fn install_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        if !self.proxy_url.is_empty() {
            for name in ["HTTP_PROXY", "HTTPS_PROXY", "http_proxy", "https_proxy"] {
                env.insert(name.to_string(), self.proxy_url.clone());
            }
        }
        env.insert(
            "BUN_INSTALL".to_string(),
            self.data_dir.join("bun").display().to_string(),
        );
        env.insert(
            "DENO_INSTALL".to_string(),
            self.data_dir.join("deno").display().to_string(),
        );
        if let Ok(path) = std::env::var("PATH") {
            env.insert("PATH".to_string(), self.extended_path(&path));
        }
        env
    }

    /// PATH plus every managed bin directory
    fn extended_path(&self, base: &str) -> String {
        let mut parts = vec![base.to_string()];
        for kind in ["nodejs", "python", "bun", "deno"] {
            parts.push(self.data_dir.join(kind).join("bin").display().to_string());
        }
        parts.join(if cfg!(windows) { ";" } else { ":" })
    }

    /// Locate a command on PATH or in a managed bin directory
    pub fn find_command(&self, command: &str) -> Option<PathBuf> {
        let path = std::env::var_os("PATH").unwrap_or_default();
        let mut dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
        for kind in ["nodejs", "python", "bun", "deno"] {
            dirs.push(self.data_dir.join(kind).join("bin"));
        }
        for dir in dirs {
            let candidate = dir.join(command);
            if candidate.is_file() {
                return Some(candidate);
            }
            #[cfg(windows)]
            {
                let exe = dir.join(format!("{}.exe", command));
                if exe.is_file() {
                    return Some(exe);
                }
            }
        }
        None
    }

    /// Best-effort version probe after install
    async fn detect_version(&self, kind: RuntimeKind) -> Option<String> {
        let (program, args): (&str, &[&str]) = match kind {
            RuntimeKind::Nodejs => ("node", &["--version"]),
            RuntimeKind::Python => ("python3", &["--version"]),
            RuntimeKind::Bun => ("bun", &["--version"]),
            RuntimeKind::Deno => ("deno", &["--version"]),
            _ => return None,
        };
        match SecureCommand::new(program)
            .args(args.iter().copied())
            .timeout(Duration::from_secs(30))
            .envs(&self.install_env())
            .run()
            .await
        {
            Ok((status, stdout, _)) if status.success() => {
                Some(stdout.lines().next().unwrap_or("").trim().to_string())
            }
            Ok(_) => None,
            Err(e) => {
                warn!(%kind, "version probe failed: {}", e);
                None
            }
        }
    }
}

/// Derive the global install command for a launcher invocation, if the
/// launcher has one: `npx foo` installs with npm, `uvx --from pkg tool`
/// with uv, `bunx foo` with bun. Returns `(package, install_command)`.
pub fn generate_install_command(command: &str, args: &[String]) -> Option<(String, String)> {
    let launcher = command.to_lowercase();
    match launcher.as_str() {
        "npx" => {
            let package = first_package_arg(args)?;
            let install = format!("npm install -g {}", package);
            Some((package, install))
        }
        "uvx" => {
            let package = match args.iter().position(|a| a == "--from") {
                Some(idx) => args.get(idx + 1)?.clone(),
                None => first_package_arg(args)?,
            };
            let install = format!("uv tool install {}", package);
            Some((package, install))
        }
        "bunx" => {
            let package = first_package_arg(args)?;
            let install = format!("bun install -g {}", package);
            Some((package, install))
        }
        _ => None,
    }
}

/// First argument that is not a flag
fn first_package_arg(args: &[String]) -> Option<String> {
    args.iter().find(|a| !a.starts_with('-')).cloned()
}

/// Pick the script flavor by reading `/etc/os-release`; anything that is
/// not recognisably Alpine gets the Debian template.
pub fn detect_os_flavor() -> OsFlavor {
    match std::fs::read_to_string("/etc/os-release") {
        Ok(text) => flavor_from_os_release(&text),
        Err(_) => OsFlavor::Debian,
    }
}

fn flavor_from_os_release(text: &str) -> OsFlavor {
    if text.to_lowercase().contains("alpine") {
        OsFlavor::Alpine
    } else {
        OsFlavor::Debian
    }
}

/// Install script templates per runtime kind and distribution
fn install_script(kind: RuntimeKind, flavor: OsFlavor) -> &'static str {
    match (kind, flavor) {
        (RuntimeKind::Nodejs, OsFlavor::Alpine) => "apk add --no-cache nodejs npm",
        (RuntimeKind::Nodejs, OsFlavor::Debian) => {
            "apt-get update -qq && apt-get install -y -qq nodejs npm"
        }
        (RuntimeKind::Python, OsFlavor::Alpine) => {
            "apk add --no-cache python3 py3-pip curl && curl -LsSf https://astral.sh/uv/install.sh | sh"
        }
        (RuntimeKind::Python, OsFlavor::Debian) => {
            "apt-get update -qq && apt-get install -y -qq python3 python3-pip curl && curl -LsSf https://astral.sh/uv/install.sh | sh"
        }
        (RuntimeKind::Bun, _) => "curl -fsSL https://bun.sh/install | bash",
        (RuntimeKind::Deno, _) => "curl -fsSL https://deno.land/install.sh | sh",
        // Unreachable through public paths; is_installable gates these
        (RuntimeKind::Docker | RuntimeKind::Custom, _) => "false",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_install_command_rules() {
        let args: Vec<String> = vec!["-y".into(), "@scope/server".into()];
        assert_eq!(
            generate_install_command("npx", &args),
            Some((
                "@scope/server".to_string(),
                "npm install -g @scope/server".to_string()
            ))
        );

        let args: Vec<String> = vec!["--from".into(), "pkg".into(), "tool".into()];
        assert_eq!(
            generate_install_command("uvx", &args),
            Some(("pkg".to_string(), "uv tool install pkg".to_string()))
        );

        let args: Vec<String> = vec!["server".into()];
        assert_eq!(
            generate_install_command("bunx", &args),
            Some(("server".to_string(), "bun install -g server".to_string()))
        );

        assert_eq!(generate_install_command("node", &[]), None);
        assert_eq!(generate_install_command("npx", &[]), None);
    }

    #[test]
    fn test_flavor_detection() {
        assert_eq!(
            flavor_from_os_release("ID=alpine\nVERSION_ID=3.19"),
            OsFlavor::Alpine
        );
        assert_eq!(
            flavor_from_os_release("ID=debian\nVERSION_ID=12"),
            OsFlavor::Debian
        );
        assert_eq!(flavor_from_os_release("ID=ubuntu"), OsFlavor::Debian);
    }

    #[tokio::test]
    async fn test_fast_path_for_present_command() {
        let dir = tempfile::tempdir().unwrap();
        let installer = RuntimeInstaller::new(dir.path(), "");
        // `sh` exists on any Unix host; detection classifies it as custom,
        // but the fast path returns before installability is consulted
        #[cfg(unix)]
        installer.ensure_installed("sh", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_custom_command_not_installable() {
        let dir = tempfile::tempdir().unwrap();
        let installer = RuntimeInstaller::new(dir.path(), "");
        let err = installer
            .ensure_installed("definitely-not-a-real-binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NotInstallable { .. }));
    }

    #[tokio::test]
    async fn test_uninstall_clears_dir_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let installer = RuntimeInstaller::new(dir.path(), "");

        // Seed an installed runtime by hand
        let kind_dir = dir.path().join("nodejs");
        std::fs::create_dir_all(&kind_dir).unwrap();
        let mut state = RuntimeState::default();
        state.runtimes.insert(
            "nodejs".into(),
            InstalledRuntime {
                installed: true,
                version: "v20".into(),
                install_path: kind_dir.display().to_string(),
                installed_at: Utc::now(),
            },
        );
        state.save(&dir.path().join("runtime_state.json")).unwrap();

        installer.uninstall(RuntimeKind::Nodejs).await.unwrap();
        assert!(!kind_dir.exists());
        assert!(!installer
            .state()
            .unwrap()
            .is_runtime_installed(RuntimeKind::Nodejs));
    }

    #[test]
    fn test_extended_path_includes_managed_bins() {
        let installer = RuntimeInstaller::new("/data/runtimes", "");
        let path = installer.extended_path("/usr/bin");
        assert!(path.starts_with("/usr/bin"));
        assert!(path.contains("/data/runtimes/bun/bin"));
    }
}
