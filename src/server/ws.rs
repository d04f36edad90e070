//! WebSocket endpoint
//!
//! Each connection runs its own session loop: text frames are dispatched
//! through the shared JSON-RPC handler with tool-as-method enabled, so a
//! client may call `tools/call` or name a tool directly.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;

use crate::server::{handle_raw, AppState};

pub(crate) async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session(socket, state))
}

async fn session(mut socket: WebSocket, state: AppState) {
    tracing::debug!("WebSocket session opened");
    while let Some(frame) = socket.recv().await {
        match frame {
            Ok(Message::Text(text)) => {
                let Some(response) = handle_raw(&state, &text, true).await else {
                    continue;
                };
                let payload = match serde_json::to_string(&response) {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::error!(%err, "failed to encode response");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong handled by axum, binary ignored
            Err(err) => {
                tracing::debug!(%err, "WebSocket receive error");
                break;
            }
        }
    }
    tracing::debug!("WebSocket session closed");
}
