//! WebSocket transport
//!
//! Connects to the server's `/mcp` endpoint and exchanges JSON-RPC messages
//! as text frames. A writer task drains the outbound channel onto the
//! socket and a reader task feeds text frames back; ping/pong frames are
//! left to the protocol layer and binary frames are ignored.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;

use crate::error::{PmAgentError, Result};
use crate::mcp::transport::Transport;

/// JSON-RPC over a WebSocket connection
#[derive(Debug)]
pub struct WebSocketTransport {
    outbound_tx: mpsc::UnboundedSender<String>,
    response_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<String>>>>,
    error_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<PmAgentError>>>>,
    cancellation: CancellationToken,
}

impl WebSocketTransport {
    /// Connect to a `ws://` or `wss://` URL
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|err| PmAgentError::Transport(format!("WebSocket connect failed: {err}")))?;
        tracing::debug!(url, "WebSocket connected");

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<String>();
        let (error_tx, error_rx) = mpsc::unbounded_channel::<PmAgentError>();
        let cancellation = CancellationToken::new();

        let writer_cancel = cancellation.clone();
        let writer_errors = error_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = writer_cancel.cancelled() => break,
                    message = outbound_rx.recv() => {
                        match message {
                            Some(text) => {
                                if let Err(err) = write.send(Message::Text(text)).await {
                                    let _ = writer_errors.send(PmAgentError::Transport(
                                        format!("WebSocket send failed: {err}"),
                                    ));
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
            let _ = write.send(Message::Close(None)).await;
        });

        let reader_cancel = cancellation.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = reader_cancel.cancelled() => break,
                    frame = read.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                if response_tx.send(text).is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::debug!("WebSocket closed by server");
                                break;
                            }
                            Some(Ok(_)) => {} // ping/pong/binary
                            Some(Err(err)) => {
                                let _ = error_tx.send(PmAgentError::Transport(format!(
                                    "WebSocket read failed: {err}"
                                )));
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            outbound_tx,
            response_rx: Arc::new(Mutex::new(Some(response_rx))),
            error_rx: Arc::new(Mutex::new(Some(error_rx))),
            cancellation,
        })
    }

    /// Close the connection; the writer task sends a close frame
    pub fn close(&self) {
        self.cancellation.cancel();
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, message: String) -> Result<()> {
        self.outbound_tx
            .send(message)
            .map_err(|_| PmAgentError::Transport("WebSocket connection closed".to_string()))?;
        Ok(())
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        Box::pin(stream::unfold(
            Arc::clone(&self.response_rx),
            |slot| async move {
                let item = {
                    let mut guard = slot.lock().await;
                    match guard.as_mut() {
                        Some(receiver) => receiver.recv().await,
                        None => None,
                    }
                };
                item.map(|message| (message, slot))
            },
        ))
    }

    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = PmAgentError> + Send + '_>> {
        Box::pin(stream::unfold(
            Arc::clone(&self.error_rx),
            |slot| async move {
                let item = {
                    let mut guard = slot.lock().await;
                    match guard.as_mut() {
                        Some(receiver) => receiver.recv().await,
                        None => None,
                    }
                };
                item.map(|err| (err, slot))
            },
        ))
    }
}
