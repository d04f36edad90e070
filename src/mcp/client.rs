//! Transport-agnostic JSON-RPC 2.0 client
//!
//! The client owns the request id counter and the map of in-flight requests.
//! It talks to a transport through a pair of unbounded string channels, so
//! the same client works over HTTP and WebSocket alike: the transport glue
//! forwards outbound messages onto the wire and feeds inbound payloads into
//! the read loop started by [`JsonRpcClient::start_read_loop`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{PmAgentError, Result};
use crate::mcp::types::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

type NotificationHandler = Arc<dyn Fn(Option<Value>) + Send + Sync>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<std::result::Result<Value, JsonRpcError>>>>>;

/// JSON-RPC client over a pair of message channels
pub struct JsonRpcClient {
    next_id: Arc<AtomicU64>,
    pending: PendingMap,
    outbound_tx: mpsc::UnboundedSender<String>,
    notification_handlers: Arc<Mutex<HashMap<String, NotificationHandler>>>,
    cancellation: CancellationToken,
}

impl JsonRpcClient {
    /// Create a client that writes outbound messages to `outbound_tx`
    pub fn new(outbound_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            outbound_tx,
            notification_handlers: Arc::new(Mutex::new(HashMap::new())),
            cancellation: CancellationToken::new(),
        }
    }

    /// Create a handle sharing this client's state
    ///
    /// The clone aliases the id counter, pending map, and handler table, so
    /// a response arriving on the read loop resolves requests issued through
    /// any handle.
    pub fn clone_shared(&self) -> Self {
        Self {
            next_id: Arc::clone(&self.next_id),
            pending: Arc::clone(&self.pending),
            outbound_tx: self.outbound_tx.clone(),
            notification_handlers: Arc::clone(&self.notification_handlers),
            cancellation: self.cancellation.clone(),
        }
    }

    /// Send a request and wait for the matching response
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);
        let message = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if self.outbound_tx.send(message).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(PmAgentError::Transport("outbound channel closed".to_string()).into());
        }
        tracing::debug!(method, id, "sent JSON-RPC request");

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(PmAgentError::Protocol(err.to_string()).into()),
            Err(_) => Err(PmAgentError::Transport(format!(
                "connection closed before response to {method} (id {id})"
            ))
            .into()),
        }
    }

    /// Send a notification (no response expected)
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcNotification::new(method, params);
        let message = serde_json::to_string(&notification)?;
        self.outbound_tx
            .send(message)
            .map_err(|_| PmAgentError::Transport("outbound channel closed".to_string()))?;
        Ok(())
    }

    /// Register a handler for server notifications with the given method
    pub async fn on_notification<F>(&self, method: &str, handler: F)
    where
        F: Fn(Option<Value>) + Send + Sync + 'static,
    {
        self.notification_handlers
            .lock()
            .await
            .insert(method.to_string(), Arc::new(handler));
    }

    /// Stop the read loop and drop all in-flight requests
    pub async fn shutdown(&self) {
        self.cancellation.cancel();
        self.pending.lock().await.clear();
    }

    /// Spawn the background task that consumes inbound messages
    pub fn start_read_loop(&self, mut inbound_rx: mpsc::UnboundedReceiver<String>) {
        let pending = Arc::clone(&self.pending);
        let handlers = Arc::clone(&self.notification_handlers);
        let outbound_tx = self.outbound_tx.clone();
        let cancellation = self.cancellation.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => {
                        tracing::debug!("JSON-RPC read loop cancelled");
                        break;
                    }
                    message = inbound_rx.recv() => {
                        match message {
                            Some(raw) => {
                                dispatch_message(&raw, &pending, &handlers, &outbound_tx).await;
                            }
                            None => {
                                tracing::debug!("inbound channel closed, stopping read loop");
                                break;
                            }
                        }
                    }
                }
            }
            // Wake anything still waiting so callers see a closed connection
            pending.lock().await.clear();
        });
    }
}

/// Classify and route one inbound message
async fn dispatch_message(
    raw: &str,
    pending: &PendingMap,
    handlers: &Arc<Mutex<HashMap<String, NotificationHandler>>>,
    outbound_tx: &mpsc::UnboundedSender<String>,
) {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(%err, "discarding unparseable message");
            return;
        }
    };

    let has_id = value.get("id").map(|id| !id.is_null()).unwrap_or(false);
    let has_method = value.get("method").is_some();

    if has_id && !has_method {
        handle_response(value, pending).await;
    } else if has_method && !has_id {
        handle_notification(value, handlers).await;
    } else if has_method && has_id {
        // Server-initiated requests are not part of this protocol; answer
        // with a method-not-found error so the peer is not left hanging.
        let method = value["method"].as_str().unwrap_or("").to_string();
        let id = value["id"].clone();
        tracing::warn!(method, "rejecting unexpected server-initiated request");
        let response = JsonRpcResponse::failure(id, JsonRpcError::method_not_found(&method));
        if let Ok(message) = serde_json::to_string(&response) {
            let _ = outbound_tx.send(message);
        }
    } else {
        tracing::warn!("discarding message with neither id nor method");
    }
}

async fn handle_response(value: Value, pending: &PendingMap) {
    let response: JsonRpcResponse = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(err) => {
            tracing::warn!(%err, "discarding malformed response");
            return;
        }
    };

    let Some(id) = response.id.as_u64() else {
        tracing::warn!(id = %response.id, "discarding response with non-numeric id");
        return;
    };

    let sender = pending.lock().await.remove(&id);
    match sender {
        Some(tx) => {
            let outcome = match (response.result, response.error) {
                (_, Some(err)) => Err(err),
                (Some(result), None) => Ok(result),
                (None, None) => Ok(Value::Null),
            };
            let _ = tx.send(outcome);
        }
        None => tracing::warn!(id, "response for unknown request id"),
    }
}

async fn handle_notification(
    value: Value,
    handlers: &Arc<Mutex<HashMap<String, NotificationHandler>>>,
) {
    let notification: JsonRpcNotification = match serde_json::from_value(value) {
        Ok(n) => n,
        Err(err) => {
            tracing::warn!(%err, "discarding malformed notification");
            return;
        }
    };

    let handler = handlers.lock().await.get(&notification.method).cloned();
    match handler {
        Some(handler) => handler(notification.params),
        None => tracing::debug!(method = %notification.method, "no handler for notification"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Build a client whose outbound messages can be inspected and whose
    /// inbound channel is fed by the test.
    fn make_client() -> (
        JsonRpcClient,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedSender<String>,
    ) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let client = JsonRpcClient::new(outbound_tx);
        client.start_read_loop(inbound_rx);
        (client, outbound_rx, inbound_tx)
    }

    #[tokio::test]
    async fn test_request_resolves_with_result() {
        let (client, mut outbound_rx, inbound_tx) = make_client();

        let task = tokio::spawn(async move {
            let raw = outbound_rx.recv().await.unwrap();
            let req: JsonRpcRequest = serde_json::from_str(&raw).unwrap();
            assert_eq!(req.method, "tools/list");
            let response =
                JsonRpcResponse::success(req.id.unwrap(), json!({"tools": []}));
            inbound_tx
                .send(serde_json::to_string(&response).unwrap())
                .unwrap();
        });

        let result = client.request("tools/list", None).await.unwrap();
        assert_eq!(result, json!({"tools": []}));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_resolves_with_error() {
        let (client, mut outbound_rx, inbound_tx) = make_client();

        tokio::spawn(async move {
            let raw = outbound_rx.recv().await.unwrap();
            let req: JsonRpcRequest = serde_json::from_str(&raw).unwrap();
            let response = JsonRpcResponse::failure(
                req.id.unwrap(),
                JsonRpcError::new(-32000, "request not found"),
            );
            inbound_tx
                .send(serde_json::to_string(&response).unwrap())
                .unwrap();
        });

        let err = client.request("get_next_task", None).await.unwrap_err();
        assert!(err.to_string().contains("-32000"));
        assert!(err.to_string().contains("request not found"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_resolve_by_id() {
        let (client, mut outbound_rx, inbound_tx) = make_client();
        let shared = client.clone_shared();

        tokio::spawn(async move {
            let mut requests = Vec::new();
            for _ in 0..2 {
                let raw = outbound_rx.recv().await.unwrap();
                requests.push(serde_json::from_str::<JsonRpcRequest>(&raw).unwrap());
            }
            // Answer in reverse order; ids must still match up
            for req in requests.into_iter().rev() {
                let response =
                    JsonRpcResponse::success(req.id.unwrap(), json!({"method": req.method}));
                inbound_tx
                    .send(serde_json::to_string(&response).unwrap())
                    .unwrap();
            }
        });

        let (a, b) = tokio::join!(
            client.request("tools/list", None),
            shared.request("initialize", None)
        );
        assert_eq!(a.unwrap(), json!({"method": "tools/list"}));
        assert_eq!(b.unwrap(), json!({"method": "initialize"}));
    }

    #[tokio::test]
    async fn test_notification_dispatched_to_handler() {
        let (client, _outbound_rx, inbound_tx) = make_client();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

        client
            .on_notification("progress", move |params| {
                seen_tx.send(params).unwrap();
            })
            .await;

        let note = JsonRpcNotification::new("progress", Some(json!({"done": 2})));
        inbound_tx
            .send(serde_json::to_string(&note).unwrap())
            .unwrap();

        let params = seen_rx.recv().await.unwrap().unwrap();
        assert_eq!(params["done"], 2);
    }

    #[tokio::test]
    async fn test_unexpected_server_request_rejected() {
        let (client, mut outbound_rx, inbound_tx) = make_client();
        let _keepalive = client;

        inbound_tx
            .send(json!({"jsonrpc": "2.0", "id": 9, "method": "roots/list"}).to_string())
            .unwrap();

        let raw = outbound_rx.recv().await.unwrap();
        let response: JsonRpcResponse = serde_json::from_str(&raw).unwrap();
        assert_eq!(response.id, json!(9));
        assert_eq!(
            response.error.unwrap().code,
            crate::mcp::types::ERROR_METHOD_NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_closed_inbound_channel_fails_pending_request() {
        let (client, mut outbound_rx, inbound_tx) = make_client();

        let task = tokio::spawn(async move {
            let _ = outbound_rx.recv().await;
            drop(inbound_tx);
        });

        let err = client.request("tools/list", None).await.unwrap_err();
        assert!(err.to_string().contains("connection closed"));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_notify_has_no_id() {
        let (client, mut outbound_rx, _inbound_tx) = make_client();
        client
            .notify("log", Some(json!({"message": "hi"})))
            .await
            .unwrap();
        let raw = outbound_rx.recv().await.unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["method"], "log");
    }
}
