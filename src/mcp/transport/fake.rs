//! In-memory transport for tests

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, Stream};
use tokio::sync::{mpsc, Mutex};

use crate::error::{PmAgentError, Result};
use crate::mcp::transport::Transport;

/// A transport backed by plain channels
///
/// Messages passed to `send` appear on the returned `sent` receiver;
/// messages pushed into the returned `inject` sender appear on `receive`.
pub struct FakeTransport {
    sent_tx: mpsc::UnboundedSender<String>,
    response_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<String>>>>,
}

impl FakeTransport {
    /// Create a fake transport plus its test-side handles
    pub fn new() -> (
        Self,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedSender<String>,
    ) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (inject_tx, inject_rx) = mpsc::unbounded_channel();
        let transport = Self {
            sent_tx,
            response_rx: Arc::new(Mutex::new(Some(inject_rx))),
        };
        (transport, sent_rx, inject_tx)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, message: String) -> Result<()> {
        self.sent_tx
            .send(message)
            .map_err(|_| PmAgentError::Transport("fake transport closed".to_string()))?;
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
        Box::pin(stream::empty())
    }
}
