//! Message transports for the JSON-RPC client
//!
//! A [`Transport`] moves opaque message strings between the client and a
//! server. Implementations exist for plain HTTP POST and for WebSocket;
//! tests use an in-memory fake. [`wire_client`] glues a transport to a
//! [`JsonRpcClient`](crate::mcp::client::JsonRpcClient) so callers never
//! touch the channel plumbing directly.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::{PmAgentError, Result};
use crate::mcp::client::JsonRpcClient;

pub mod http;
pub mod ws;

#[cfg(test)]
pub mod fake;

pub use http::HttpTransport;
pub use ws::WebSocketTransport;

/// A bidirectional message transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one message to the server
    async fn send(&self, message: String) -> Result<()>;

    /// Stream of inbound messages from the server
    ///
    /// The stream ends when the underlying connection closes. Only one
    /// consumer may drain it; later calls observe an empty stream.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;

    /// Stream of transport-level errors that occur outside `send` calls
    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = PmAgentError> + Send + '_>>;
}

/// Wire a transport to a new [`JsonRpcClient`]
///
/// Spawns the forwarding tasks (outbound channel to `transport.send`,
/// `transport.receive` to the client's read loop) and starts the read loop.
pub fn wire_client(transport: Arc<dyn Transport>) -> JsonRpcClient {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

    let client = JsonRpcClient::new(outbound_tx);
    client.start_read_loop(inbound_rx);

    let sender = Arc::clone(&transport);
    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if let Err(err) = sender.send(message).await {
                tracing::warn!(%err, "transport send failed");
            }
        }
    });

    let receiver = Arc::clone(&transport);
    tokio::spawn(async move {
        let mut incoming = receiver.receive();
        while let Some(message) = incoming.next().await {
            if inbound_tx.send(message).is_err() {
                break;
            }
        }
        tracing::debug!("transport inbound stream ended");
    });

    tokio::spawn(async move {
        let mut errors = transport.receive_err();
        while let Some(err) = errors.next().await {
            tracing::warn!(%err, "transport error");
        }
    });

    client
}
