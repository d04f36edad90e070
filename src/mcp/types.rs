//! JSON-RPC 2.0 and MCP wire types
//!
//! Envelope structs shared by the client, the transports, and the server.
//! Optional fields use `skip_serializing_if` so messages on the wire stay
//! minimal and match what the Python-era clients expect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC protocol version string
pub const JSONRPC_VERSION: &str = "2.0";

/// Method name for the initialize handshake
pub const METHOD_INITIALIZE: &str = "initialize";
/// Method name for listing the tool catalog
pub const METHOD_TOOLS_LIST: &str = "tools/list";
/// Method name for invoking a tool
pub const METHOD_TOOLS_CALL: &str = "tools/call";
/// Accepted alias for `tools/call`
pub const METHOD_TOOLS_INVOKE: &str = "tools/invoke";

/// JSON-RPC error code: malformed JSON
pub const ERROR_PARSE: i64 = -32700;
/// JSON-RPC error code: not a valid request object
pub const ERROR_INVALID_REQUEST: i64 = -32600;
/// JSON-RPC error code: unknown method
pub const ERROR_METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC error code: invalid method parameters
pub const ERROR_INVALID_PARAMS: i64 = -32602;
/// JSON-RPC error code: internal server failure
pub const ERROR_INTERNAL: i64 = -32603;
/// JSON-RPC error code: domain-level server error
pub const ERROR_SERVER: i64 = -32000;

/// A JSON-RPC request
///
/// The `id` is carried as a raw JSON value because peers are free to use
/// numbers or strings; our own client always sends numeric ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// Protocol version, always "2.0"
    pub jsonrpc: String,
    /// Request identifier; absent for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a request with a numeric id
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(Value::from(id)),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC notification (a request without an id, expecting no reply)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcNotification {
    /// Protocol version, always "2.0"
    pub jsonrpc: String,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a notification
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC response, carrying either a result or an error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// Protocol version, always "2.0"
    pub jsonrpc: String,
    /// Identifier of the request being answered; null when the request id
    /// could not be read (e.g. a parse error)
    pub id: Value,
    /// Result payload on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Build a success response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response
    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    /// Error code (see the `ERROR_*` constants)
    pub code: i64,
    /// Human-readable message
    pub message: String,
    /// Optional structured detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create an error with a code and message
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Unknown method error
    pub fn method_not_found(method: &str) -> Self {
        Self::new(ERROR_METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    /// Invalid parameters error
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ERROR_INVALID_PARAMS, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ERROR_INTERNAL, message)
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A tool advertised in the catalog
///
/// `parameters` holds a JSON-Schema-style object describing the accepted
/// invocation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Tool name, unique within the catalog
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameter schema
    pub parameters: Value,
}

/// Response payload of `GET /tools` and `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListToolsResponse {
    /// Advertised tools
    pub tools: Vec<ToolDefinition>,
}

/// Parameters of a tool invocation (`POST /invoke`, `tools/call`)
///
/// `arguments` is accepted as an alias for `parameters`; both spellings
/// exist in the wild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvokeParams {
    /// Tool to invoke
    pub name: String,
    /// Tool parameters; defaults to an empty object
    #[serde(default = "empty_object", alias = "arguments")]
    pub parameters: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Result envelope returned by `POST /invoke` and `tools/call`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvokeResult {
    /// The tool's result value
    pub result: Value,
}

/// Server identity returned by `GET /`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
    /// Endpoint map, when advertised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Value>,
}

/// Result of the `initialize` handshake: identity plus the tool catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeResult {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
    /// Advertised tools
    pub tools: Vec<ToolDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_without_empty_fields() {
        let req = JsonRpcRequest::new(1, METHOD_TOOLS_LIST, None);
        let wire = serde_json::to_string(&req).unwrap();
        assert!(wire.contains("\"jsonrpc\":\"2.0\""));
        assert!(wire.contains("\"id\":1"));
        assert!(!wire.contains("params"));
    }

    #[test]
    fn test_request_with_params_round_trips() {
        let req = JsonRpcRequest::new(
            7,
            METHOD_TOOLS_CALL,
            Some(json!({"name": "list_projects", "parameters": {}})),
        );
        let wire = serde_json::to_string(&req).unwrap();
        let back: JsonRpcRequest = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn test_notification_has_no_id() {
        let note = JsonRpcNotification::new("log", Some(json!({"level": "info"})));
        let wire = serde_json::to_value(&note).unwrap();
        assert!(wire.get("id").is_none());
        assert_eq!(wire["method"], "log");
    }

    #[test]
    fn test_response_success_round_trips() {
        let resp = JsonRpcResponse::success(json!(3), json!({"result": {"ok": true}}));
        let wire = serde_json::to_string(&resp).unwrap();
        assert!(!wire.contains("error"));
        let back: JsonRpcResponse = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, resp);
    }

    #[test]
    fn test_response_failure_carries_error() {
        let resp = JsonRpcResponse::failure(json!(4), JsonRpcError::method_not_found("bogus"));
        let wire = serde_json::to_value(&resp).unwrap();
        assert_eq!(wire["error"]["code"], ERROR_METHOD_NOT_FOUND);
        assert!(wire.get("result").is_none());
    }

    #[test]
    fn test_error_display_format() {
        let err = JsonRpcError::new(ERROR_SERVER, "project not found");
        assert_eq!(err.to_string(), "JSON-RPC error -32000: project not found");
    }

    #[test]
    fn test_invoke_params_accepts_arguments_alias() {
        let params: InvokeParams =
            serde_json::from_value(json!({"name": "get_project", "arguments": {"project_id": "p1"}}))
                .unwrap();
        assert_eq!(params.name, "get_project");
        assert_eq!(params.parameters["project_id"], "p1");
    }

    #[test]
    fn test_invoke_params_default_to_empty_object() {
        let params: InvokeParams = serde_json::from_value(json!({"name": "list_projects"})).unwrap();
        assert!(params.parameters.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_tool_definition_round_trips() {
        let tool = ToolDefinition {
            name: "create_project".to_string(),
            description: "Create a new project".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
        };
        let wire = serde_json::to_string(&tool).unwrap();
        let back: ToolDefinition = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, tool);
    }

    #[test]
    fn test_initialize_result_deserializes() {
        let raw = json!({
            "name": "pmagent-mcp-server",
            "version": "0.1.0",
            "tools": [{"name": "list_projects", "description": "List projects", "parameters": {}}]
        });
        let init: InitializeResult = serde_json::from_value(raw).unwrap();
        assert_eq!(init.name, "pmagent-mcp-server");
        assert_eq!(init.tools.len(), 1);
    }

    #[test]
    fn test_request_without_id_parses_as_notification_shape() {
        let raw = json!({"jsonrpc": "2.0", "method": "log", "params": {"x": 1}});
        let req: JsonRpcRequest = serde_json::from_value(raw).unwrap();
        assert!(req.id.is_none());
    }
}
