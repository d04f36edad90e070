//! MCP client subsystem
//!
//! - `types`: JSON-RPC 2.0 envelope and catalog wire types
//! - `client`: transport-agnostic JSON-RPC request/response machinery
//! - `protocol`: typed `initialize` / `tools/list` / `tools/call` wrapper
//! - `transport`: HTTP and WebSocket transports plus client wiring

pub mod client;
pub mod protocol;
pub mod transport;
pub mod types;

pub use client::JsonRpcClient;
pub use protocol::{InitializedMcpProtocol, McpProtocol};
pub use transport::{wire_client, HttpTransport, Transport, WebSocketTransport};
pub use types::*;
