//! # Toolgate MCP
//!
//! The protocol heart of the gateway: JSON-RPC 2.0 framing and MCP
//! message types, the three client transports (stdio, SSE, streamable
//! HTTP), the discovery session that normalises backend toolsets, the
//! API-bridge executor for REST-wrapped services, the two-tier
//! stale-while-revalidate tool cache, and the JSON-RPC handlers exposed
//! to clients: a transparent per-service proxy and the per-group
//! aggregation facade with weighted, health-aware routing.

pub mod bridge;
pub mod client;
pub mod error;
pub mod protocol;
pub mod selection;
pub mod server;
pub mod tool_cache;
pub mod transport;

// Re-export commonly used types
pub use error::{McpError, McpResult};
pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION,
};

pub use bridge::{ApiBridgeExecutor, BridgeCallOutcome};
pub use client::{DiscoveryClient, DiscoveryResult, ToolDiscovery};
pub use selection::{ServiceStatsRegistry, StatsSnapshot};
pub use server::{AggregationHandler, ServiceMcpHandler};
pub use tool_cache::{ToolCacheService, ToolsWithOrigin};
pub use transport::{McpTransport, TransportKind};

/// Default timeout for one MCP request leg
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
