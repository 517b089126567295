//! stdio transport: a spawned subprocess speaking line-delimited JSON-RPC
//!
//! Each frame is one UTF-8 line on stdin/stdout. stderr is drained into a
//! bounded diagnostic buffer so a chatty backend cannot grow memory and a
//! failed handshake can still report what the process printed.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use toolgate_core::service::Service;
use toolgate_runtime::{
    kill_process_group, validate_mcp_server_command, RuntimeInstaller, SecureCommand,
    MCP_COMMAND_TIMEOUT,
};

use crate::error::{McpError, McpResult};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::McpTransport;

/// Cap on retained stderr diagnostics
const MAX_STDERR_BYTES: usize = 16 * 1024;

/// Line-delimited JSON-RPC over a child process
pub struct StdioTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr_tail: Arc<Mutex<String>>,
}

impl StdioTransport {
    /// Validate the command, ensure its runtime is provisioned, and spawn
    /// the backend with pipes on all three fds.
    pub async fn spawn(service: &Service, installer: &RuntimeInstaller) -> McpResult<Self> {
        validate_mcp_server_command(&service.command, &service.args)?;
        installer
            .ensure_installed(&service.command, &service.args)
            .await?;

        let mut builder = SecureCommand::new(&service.command)
            .args(service.args.iter().cloned())
            .envs(&service.env_defaults)
            .timeout(MCP_COMMAND_TIMEOUT)
            .piped();
        if !service.cwd.is_empty() {
            builder = builder.current_dir(&service.cwd);
        }

        let mut child = builder.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::transport("child stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::transport("child stdout unavailable"))?;
        let stderr = child.stderr.take();

        let stderr_tail = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = stderr {
            let tail = stderr_tail.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let mut buf = tail.lock().await;
                    if buf.len() < MAX_STDERR_BYTES {
                        buf.push_str(&line);
                        buf.push('\n');
                    }
                }
            });
        }

        debug!(command = %service.command, "stdio backend spawned");
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            stderr_tail,
        })
    }

    /// Captured stderr so far, for error reporting
    pub async fn stderr_tail(&self) -> String {
        self.stderr_tail.lock().await.clone()
    }

    async fn write_frame(&mut self, frame: &impl serde::Serialize) -> McpResult<()> {
        let mut line = serde_json::to_string(frame)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read frames until one parses as a response with the wanted id.
    /// Server-initiated requests and notifications are skipped.
    async fn read_response(&mut self, id: &serde_json::Value) -> McpResult<JsonRpcResponse> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| McpError::transport("backend closed stdout"))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JsonRpcResponse>(&line) {
                Ok(response) if response.id.as_ref() == Some(id) => return Ok(response),
                Ok(_) => continue,
                Err(_) => {
                    // Not a response frame; ignore server-initiated traffic
                    debug!("skipping non-response frame: {}", line);
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl McpTransport for StdioTransport {
    async fn request(
        &mut self,
        request: JsonRpcRequest,
        timeout: Duration,
    ) -> McpResult<JsonRpcResponse> {
        let id = request
            .id
            .clone()
            .ok_or_else(|| McpError::protocol("request requires an id"))?;
        self.write_frame(&request).await?;
        match tokio::time::timeout(timeout, self.read_response(&id)).await {
            Ok(result) => result,
            Err(_) => {
                let tail = self.stderr_tail().await;
                if !tail.is_empty() {
                    warn!("backend stderr before timeout: {}", tail.trim_end());
                }
                Err(McpError::RequestTimeout { timeout })
            }
        }
    }

    async fn notify(&mut self, notification: JsonRpcRequest) -> McpResult<()> {
        self.write_frame(&notification).await
    }

    async fn close(&mut self) -> McpResult<()> {
        if let Some(pid) = self.child.id() {
            kill_process_group(pid);
        }
        let _ = self.child.wait().await;
        Ok(())
    }
}
