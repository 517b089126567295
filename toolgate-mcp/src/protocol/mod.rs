//! MCP protocol implementation: JSON-RPC 2.0 framing and MCP-specific
//! message types

pub mod jsonrpc;
pub mod messages;

pub use jsonrpc::{JsonRpcError, JsonRpcErrorCode, JsonRpcRequest, JsonRpcResponse};
pub use messages::{
    ClientCapabilities, ClientInfo, InitializeParams, InitializeResult, ServerCapabilities,
    ServerInfo, Tool, ToolContent, ToolsCallParams, ToolsCallResult, ToolsListResult,
    ToolsCapability,
};

/// MCP protocol version spoken on every transport
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Generate a fresh request id
pub fn generate_request_id() -> serde_json::Value {
    serde_json::Value::String(uuid::Uuid::new_v4().to_string())
}

/// Method names used across the handlers and the discovery client
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const NOTIFICATION_INITIALIZED: &str = "notifications/initialized";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const PING: &str = "ping";
}
