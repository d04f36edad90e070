//! End-to-end tests running the real server on an ephemeral port

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};

use pmagent::mcp::transport::{wire_client, HttpTransport, WebSocketTransport};
use pmagent::mcp::McpProtocol;
use pmagent::server;
use pmagent::store::{PlanningManager, ProjectStore, ToolRegistry};

async fn spawn_server() -> (SocketAddr, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(ToolRegistry::new(
        Arc::new(ProjectStore::open(dir.path()).unwrap()),
        Arc::new(PlanningManager::open(dir.path()).unwrap()),
    ));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::router(registry);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, dir)
}

#[tokio::test]
async fn test_rest_surface() {
    let (addr, _dir) = spawn_server().await;
    let base = format!("http://{addr}");
    let http = reqwest::Client::new();

    let info: Value = http.get(&base).send().await.unwrap().json().await.unwrap();
    assert_eq!(info["name"], "pmagent-mcp-server");

    let health: Value = http
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let catalog: Value = http
        .get(format!("{base}/tools"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(catalog["tools"].as_array().unwrap().len(), 19);

    // Create then fetch through /invoke
    let created: Value = http
        .post(format!("{base}/invoke"))
        .json(&json!({"name": "create_project", "parameters": {"name": "website"}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let project_id = created["result"]["id"].as_str().unwrap();

    let fetched: Value = http
        .post(format!("{base}/invoke"))
        .json(&json!({"name": "get_project", "parameters": {"project_id": project_id}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["result"]["name"], "website");
}

#[tokio::test]
async fn test_invoke_error_statuses() {
    let (addr, _dir) = spawn_server().await;
    let base = format!("http://{addr}");
    let http = reqwest::Client::new();

    let unknown = http
        .post(format!("{base}/invoke"))
        .json(&json!({"name": "frobnicate", "parameters": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);
    let body: Value = unknown.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("unknown tool"));

    let invalid = http
        .post(format!("{base}/invoke"))
        .json(&json!({"name": "get_project", "parameters": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), 400);

    let missing = http
        .post(format!("{base}/invoke"))
        .json(&json!({"name": "get_project", "parameters": {"project_id": "p9"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_jsonrpc_over_http_with_full_client_stack() {
    let (addr, _dir) = spawn_server().await;
    let transport = Arc::new(HttpTransport::new(&format!("http://{addr}/")).unwrap());
    let client = wire_client(transport);

    let session = McpProtocol::new(client).initialize().await.unwrap();
    assert_eq!(session.server_name(), "pmagent-mcp-server");

    let tools = session.list_tools().await.unwrap();
    assert!(tools.iter().any(|t| t.name == "request_planning"));

    let project = session
        .invoke_tool("create_project", json!({"name": "demo"}))
        .await
        .unwrap();
    assert_eq!(project["name"], "demo");

    let err = session
        .invoke_tool("get_project", json!({"project_id": "p9"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("-32000"));
}

#[tokio::test]
async fn test_jsonrpc_unknown_method_over_http() {
    let (addr, _dir) = spawn_server().await;
    let http = reqwest::Client::new();

    let response: Value = http
        .post(format!("http://{addr}/"))
        .header("Content-Type", "application/json")
        .body(json!({"jsonrpc": "2.0", "id": 1, "method": "list_projects"}).to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // Tool-as-method is a WebSocket-only convenience
    assert_eq!(response["error"]["code"], -32601);
}

#[tokio::test]
async fn test_websocket_protocol_session() {
    let (addr, _dir) = spawn_server().await;
    let transport = WebSocketTransport::connect(&format!("ws://{addr}/mcp"))
        .await
        .unwrap();
    let client = wire_client(Arc::new(transport));

    let session = McpProtocol::new(client).initialize().await.unwrap();
    let receipt = session
        .invoke_tool(
            "request_planning",
            json!({"originalRequest": "ship it", "tasks": [{"title": "write"}]}),
        )
        .await
        .unwrap();
    assert_eq!(receipt["taskCount"], 1);
}

#[tokio::test]
async fn test_websocket_tool_as_method() {
    let (addr, _dir) = spawn_server().await;
    let transport = WebSocketTransport::connect(&format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let client = wire_client(Arc::new(transport));

    let result = client
        .request("create_project", Some(json!({"name": "direct"})))
        .await
        .unwrap();
    assert_eq!(result["result"]["name"], "direct");

    let err = client.request("frobnicate", Some(json!({}))).await.unwrap_err();
    assert!(err.to_string().contains("-32601"));
}
