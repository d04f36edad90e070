//! PMAgent - Project-management MCP server and client utilities
//!
//! This library provides an MCP server exposing project and planning tools
//! over HTTP, JSON-RPC, and WebSocket, plus the client side: a JSON-RPC
//! client with pluggable transports, a typed protocol wrapper, and a typed
//! REST client.
//!
//! # Architecture
//!
//! - `store`: project/task CRUD, the planning workflow, and the tool registry
//! - `server`: the axum server exposing the registry on every surface
//! - `mcp`: JSON-RPC types, client machinery, protocol wrapper, transports
//! - `client`: typed REST client for `GET /tools` / `POST /invoke`
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use pmagent::PmClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PmClient::new("http://127.0.0.1:8080")?;
//!     for tool in client.list_tools().await? {
//!         println!("{}", tool.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod mcp;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use client::PmClient;
pub use config::Config;
pub use error::{PmAgentError, Result};
pub use mcp::{InitializedMcpProtocol, JsonRpcClient, McpProtocol};
pub use store::{PlanningManager, ProjectStore, ToolRegistry};
