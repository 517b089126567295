//! Client transports for the three standard MCP channels

pub mod sse;
pub mod stdio;
pub mod streamable_http;

use std::time::Duration;

use async_trait::async_trait;

use toolgate_core::service::{Service, ServiceType};
use toolgate_runtime::RuntimeInstaller;

use crate::error::{McpError, McpResult};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

pub use sse::SseTransport;
pub use stdio::StdioTransport;
pub use streamable_http::StreamableHttpTransport;

/// Which channel a transport speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Sse,
    StreamableHttp,
}

/// One bidirectional MCP channel to a backend.
///
/// Implementations match requests to responses by JSON-RPC id and skip
/// unrelated server-initiated traffic. Every request leg is bounded by the
/// caller-supplied timeout.
#[async_trait]
pub trait McpTransport: Send {
    /// Send a request and wait for its response
    async fn request(
        &mut self,
        request: JsonRpcRequest,
        timeout: Duration,
    ) -> McpResult<JsonRpcResponse>;

    /// Send a notification; nothing comes back
    async fn notify(&mut self, notification: JsonRpcRequest) -> McpResult<()>;

    /// Tear the channel down, reaping any subprocess
    async fn close(&mut self) -> McpResult<()>;
}

/// Open the transport matching a service record. stdio services get their
/// runtime provisioned on first use.
pub async fn open_transport(
    service: &Service,
    installer: &RuntimeInstaller,
    timeout: Duration,
) -> McpResult<Box<dyn McpTransport>> {
    match service.service_type {
        ServiceType::Stdio => {
            let transport = StdioTransport::spawn(service, installer).await?;
            Ok(Box::new(transport))
        }
        ServiceType::Sse => {
            let transport = SseTransport::connect(&service.api_endpoint, timeout).await?;
            Ok(Box::new(transport))
        }
        ServiceType::StreamableHttp => {
            let transport = StreamableHttpTransport::new(&service.api_endpoint)?;
            Ok(Box::new(transport))
        }
        ServiceType::ApiBridge => Err(McpError::protocol(
            "api_bridge services have no MCP transport",
        )),
    }
}
