//! Typed MCP protocol wrapper
//!
//! Wraps a [`JsonRpcClient`] with the method vocabulary the server speaks:
//! `initialize`, `tools/list`, and `tools/call`. The wrapper is a typestate
//! pair: [`McpProtocol`] can only initialize, and tool operations live on
//! [`InitializedMcpProtocol`], so a handshake always happens first.

use serde_json::{json, Value};

use crate::error::{PmAgentError, Result};
use crate::mcp::client::JsonRpcClient;
use crate::mcp::types::{
    InitializeResult, ListToolsResponse, ToolDefinition, METHOD_INITIALIZE, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST,
};

/// A protocol session that has not yet performed the initialize handshake
pub struct McpProtocol {
    client: JsonRpcClient,
}

impl McpProtocol {
    /// Wrap a wired JSON-RPC client
    pub fn new(client: JsonRpcClient) -> Self {
        Self { client }
    }

    /// Perform the `initialize` handshake
    ///
    /// Captures the server's identity and initial tool catalog and returns
    /// the initialized session.
    pub async fn initialize(self) -> Result<InitializedMcpProtocol> {
        let raw = self.client.request(METHOD_INITIALIZE, None).await?;
        let info: InitializeResult = serde_json::from_value(raw).map_err(|err| {
            PmAgentError::Protocol(format!("malformed initialize response: {err}"))
        })?;
        tracing::info!(server = %info.name, version = %info.version, "MCP session initialized");
        Ok(InitializedMcpProtocol {
            client: self.client,
            info,
        })
    }
}

/// An initialized protocol session
pub struct InitializedMcpProtocol {
    client: JsonRpcClient,
    info: InitializeResult,
}

impl std::fmt::Debug for InitializedMcpProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializedMcpProtocol")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl InitializedMcpProtocol {
    /// Server name reported during initialization
    pub fn server_name(&self) -> &str {
        &self.info.name
    }

    /// Server version reported during initialization
    pub fn server_version(&self) -> &str {
        &self.info.version
    }

    /// Tool catalog captured during initialization
    pub fn initial_tools(&self) -> &[ToolDefinition] {
        &self.info.tools
    }

    /// Fetch the current tool catalog via `tools/list`
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let raw = self.client.request(METHOD_TOOLS_LIST, None).await?;
        let response: ListToolsResponse = serde_json::from_value(raw).map_err(|err| {
            PmAgentError::Protocol(format!("malformed tools/list response: {err}"))
        })?;
        Ok(response.tools)
    }

    /// Invoke a tool via `tools/call` and return its result value
    pub async fn invoke_tool(&self, name: &str, parameters: Value) -> Result<Value> {
        let params = json!({"name": name, "parameters": parameters});
        let raw = self.client.request(METHOD_TOOLS_CALL, Some(params)).await?;
        // The server wraps tool output in a {"result": ...} envelope
        match raw {
            Value::Object(mut map) => match map.remove("result") {
                Some(result) => Ok(result),
                None => Ok(Value::Object(map)),
            },
            other => Ok(other),
        }
    }

    /// Tear down the session
    pub async fn shutdown(&self) {
        self.client.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::types::{JsonRpcRequest, JsonRpcResponse};
    use tokio::sync::mpsc;

    /// Wire a protocol to an in-process responder task
    fn wired_protocol<F>(responder: F) -> McpProtocol
    where
        F: Fn(JsonRpcRequest) -> Value + Send + 'static,
    {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let client = JsonRpcClient::new(outbound_tx);
        client.start_read_loop(inbound_rx);

        tokio::spawn(async move {
            while let Some(raw) = outbound_rx.recv().await {
                let req: JsonRpcRequest = serde_json::from_str(&raw).unwrap();
                let id = req.id.clone().unwrap();
                let result = responder(req);
                let response = JsonRpcResponse::success(id, result);
                if inbound_tx
                    .send(serde_json::to_string(&response).unwrap())
                    .is_err()
                {
                    break;
                }
            }
        });

        McpProtocol::new(client)
    }

    fn catalog() -> Value {
        json!([
            {"name": "list_projects", "description": "List all projects", "parameters": {}},
            {"name": "create_task", "description": "Create a task", "parameters": {}}
        ])
    }

    #[tokio::test]
    async fn test_initialize_captures_server_info() {
        let protocol = wired_protocol(|req| {
            assert_eq!(req.method, METHOD_INITIALIZE);
            json!({"name": "pmagent-mcp-server", "version": "0.1.0", "tools": catalog()})
        });

        let session = protocol.initialize().await.unwrap();
        assert_eq!(session.server_name(), "pmagent-mcp-server");
        assert_eq!(session.server_version(), "0.1.0");
        assert_eq!(session.initial_tools().len(), 2);
    }

    #[tokio::test]
    async fn test_initialize_rejects_malformed_response() {
        let protocol = wired_protocol(|_| json!({"unexpected": true}));
        let err = protocol.initialize().await.unwrap_err();
        assert!(err.to_string().contains("malformed initialize response"));
    }

    #[tokio::test]
    async fn test_list_tools_after_initialize() {
        let protocol = wired_protocol(|req| match req.method.as_str() {
            METHOD_INITIALIZE => {
                json!({"name": "pmagent-mcp-server", "version": "0.1.0", "tools": []})
            }
            METHOD_TOOLS_LIST => json!({"tools": catalog()}),
            other => panic!("unexpected method {other}"),
        });

        let session = protocol.initialize().await.unwrap();
        let tools = session.list_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "list_projects");
    }

    #[tokio::test]
    async fn test_invoke_tool_unwraps_result_envelope() {
        let protocol = wired_protocol(|req| match req.method.as_str() {
            METHOD_INITIALIZE => {
                json!({"name": "pmagent-mcp-server", "version": "0.1.0", "tools": []})
            }
            METHOD_TOOLS_CALL => {
                let params = req.params.unwrap();
                assert_eq!(params["name"], "get_project");
                assert_eq!(params["parameters"]["project_id"], "p1");
                json!({"result": {"id": "p1", "name": "demo"}})
            }
            other => panic!("unexpected method {other}"),
        });

        let session = protocol.initialize().await.unwrap();
        let result = session
            .invoke_tool("get_project", json!({"project_id": "p1"}))
            .await
            .unwrap();
        assert_eq!(result["name"], "demo");
    }
}
