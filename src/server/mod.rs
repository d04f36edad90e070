//! MCP server
//!
//! Exposes the tool registry over three surfaces:
//!
//! - plain HTTP: `GET /tools` and `POST /invoke`
//! - JSON-RPC 2.0 over `POST /` (`initialize`, `tools/list`, `tools/call`)
//! - JSON-RPC 2.0 over WebSocket at `/mcp` (alias `/ws`), where a method
//!   may also name a tool directly
//!
//! plus `GET /` (server identity) and `GET /health`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::Result;
use crate::mcp::types::{
    InvokeParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResponse, ServerInfo,
    ERROR_INVALID_REQUEST, ERROR_PARSE, JSONRPC_VERSION, METHOD_INITIALIZE, METHOD_TOOLS_CALL,
    METHOD_TOOLS_INVOKE, METHOD_TOOLS_LIST,
};
use crate::store::{ToolError, ToolErrorKind, ToolRegistry};

mod ws;

/// Name reported by `GET /` and `initialize`
pub const SERVER_NAME: &str = "pmagent-mcp-server";
/// Version reported by `GET /` and `initialize`
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    registry: Arc<ToolRegistry>,
}

/// Build the application router
pub fn router(registry: Arc<ToolRegistry>) -> Router {
    Router::new()
        .route("/", get(server_info).post(jsonrpc))
        .route("/tools", get(list_tools))
        .route("/invoke", post(invoke))
        .route("/health", get(health))
        .route("/mcp", get(ws::upgrade))
        .route("/ws", get(ws::upgrade))
        .with_state(AppState { registry })
}

/// Bind and serve until the process exits
pub async fn serve(addr: SocketAddr, registry: Arc<ToolRegistry>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "MCP server listening");
    axum::serve(listener, router(registry)).await?;
    Ok(())
}

async fn server_info() -> Json<ServerInfo> {
    Json(ServerInfo {
        name: SERVER_NAME.to_string(),
        version: SERVER_VERSION.to_string(),
        endpoints: Some(json!({
            "tools": "GET /tools",
            "invoke": "POST /invoke",
            "jsonrpc": "POST /",
            "websocket": "GET /mcp",
            "health": "GET /health"
        })),
    })
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn list_tools(State(state): State<AppState>) -> Json<ListToolsResponse> {
    Json(ListToolsResponse {
        tools: state.registry.definitions(),
    })
}

async fn invoke(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let params: InvokeParams = match serde_json::from_value(body) {
        Ok(params) => params,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": format!("invalid invocation: {err}")})),
            )
                .into_response()
        }
    };

    match state.registry.invoke(&params.name, params.parameters).await {
        Ok(result) => Json(json!({"result": result})).into_response(),
        Err(err) => tool_error_response(&err),
    }
}

fn tool_error_response(err: &ToolError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"detail": err.message}))).into_response()
}

/// JSON-RPC over HTTP POST
///
/// Notifications are acknowledged with 202 and no body.
async fn jsonrpc(State(state): State<AppState>, body: String) -> Response {
    match handle_raw(&state, &body, false).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Parse and dispatch one JSON-RPC message; `None` means no reply is owed
pub(crate) async fn handle_raw(
    state: &AppState,
    raw: &str,
    allow_tool_methods: bool,
) -> Option<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str(raw) {
        Ok(request) => request,
        Err(err) => {
            return Some(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(ERROR_PARSE, format!("parse error: {err}")),
            ))
        }
    };

    let Some(id) = request.id.clone() else {
        tracing::debug!(method = %request.method, "ignoring notification");
        return None;
    };

    Some(handle_request(state, id, request, allow_tool_methods).await)
}

async fn handle_request(
    state: &AppState,
    id: Value,
    request: JsonRpcRequest,
    allow_tool_methods: bool,
) -> JsonRpcResponse {
    if request.jsonrpc != JSONRPC_VERSION {
        return JsonRpcResponse::failure(
            id,
            JsonRpcError::new(ERROR_INVALID_REQUEST, "jsonrpc must be \"2.0\""),
        );
    }

    match request.method.as_str() {
        METHOD_INITIALIZE => JsonRpcResponse::success(
            id,
            json!({
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
                "tools": state.registry.definitions()
            }),
        ),
        METHOD_TOOLS_LIST => {
            JsonRpcResponse::success(id, json!({"tools": state.registry.definitions()}))
        }
        METHOD_TOOLS_CALL | METHOD_TOOLS_INVOKE => {
            let params: InvokeParams =
                match serde_json::from_value(request.params.unwrap_or_else(|| json!({}))) {
                    Ok(params) => params,
                    Err(err) => {
                        return JsonRpcResponse::failure(
                            id,
                            JsonRpcError::invalid_params(format!("invalid invocation: {err}")),
                        )
                    }
                };
            match state.registry.invoke(&params.name, params.parameters).await {
                Ok(result) => JsonRpcResponse::success(id, json!({"result": result})),
                Err(err) => JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(err.jsonrpc_code(), err.message),
                ),
            }
        }
        method if allow_tool_methods => {
            let params = request.params.unwrap_or_else(|| json!({}));
            match state.registry.invoke(method, params).await {
                Ok(result) => JsonRpcResponse::success(id, json!({"result": result})),
                Err(err) if err.kind == ToolErrorKind::UnknownTool => {
                    JsonRpcResponse::failure(id, JsonRpcError::method_not_found(method))
                }
                Err(err) => JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(err.jsonrpc_code(), err.message),
                ),
            }
        }
        method => JsonRpcResponse::failure(id, JsonRpcError::method_not_found(method)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::types::ERROR_METHOD_NOT_FOUND;
    use crate::store::{PlanningManager, ProjectStore};
    use tempfile::tempdir;

    fn state(dir: &std::path::Path) -> AppState {
        AppState {
            registry: Arc::new(ToolRegistry::new(
                Arc::new(ProjectStore::open(dir).unwrap()),
                Arc::new(PlanningManager::open(dir).unwrap()),
            )),
        }
    }

    #[tokio::test]
    async fn test_initialize_returns_catalog() {
        let dir = tempdir().unwrap();
        let state = state(dir.path());
        let raw = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}).to_string();

        let response = handle_raw(&state, &raw, false).await.unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["name"], SERVER_NAME);
        assert!(!result["tools"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tools_invoke_alias() {
        let dir = tempdir().unwrap();
        let state = state(dir.path());
        let raw = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/invoke",
            "params": {"name": "create_project", "parameters": {"name": "demo"}}
        })
        .to_string();

        let response = handle_raw(&state, &raw, false).await.unwrap();
        assert_eq!(response.result.unwrap()["result"]["name"], "demo");
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let dir = tempdir().unwrap();
        let state = state(dir.path());

        let response = handle_raw(&state, "{broken", false).await.unwrap();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, ERROR_PARSE);
    }

    #[tokio::test]
    async fn test_notification_gets_no_reply() {
        let dir = tempdir().unwrap();
        let state = state(dir.path());
        let raw = json!({"jsonrpc": "2.0", "method": "log"}).to_string();
        assert!(handle_raw(&state, &raw, false).await.is_none());
    }

    #[tokio::test]
    async fn test_tool_as_method_only_on_websocket_surface() {
        let dir = tempdir().unwrap();
        let state = state(dir.path());
        let raw = json!({"jsonrpc": "2.0", "id": 3, "method": "list_projects"}).to_string();

        let over_http = handle_raw(&state, &raw, false).await.unwrap();
        assert_eq!(over_http.error.unwrap().code, ERROR_METHOD_NOT_FOUND);

        let over_ws = handle_raw(&state, &raw, true).await.unwrap();
        assert!(over_ws.result.unwrap()["result"]["projects"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_wrong_jsonrpc_version_rejected() {
        let dir = tempdir().unwrap();
        let state = state(dir.path());
        let raw = json!({"jsonrpc": "1.0", "id": 4, "method": "initialize"}).to_string();

        let response = handle_raw(&state, &raw, false).await.unwrap();
        assert_eq!(response.error.unwrap().code, ERROR_INVALID_REQUEST);
    }
}
