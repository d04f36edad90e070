//! HTTP transport
//!
//! Each outbound message is POSTed to the server's JSON-RPC endpoint; the
//! response body (if any) is fed back to the client through an internal
//! channel. The server replies to requests in the POST response itself, so
//! there is no long-lived connection to manage.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, Stream};
use reqwest::StatusCode;
use tokio::sync::{mpsc, Mutex};
use url::Url;

use crate::error::{PmAgentError, Result};
use crate::mcp::transport::Transport;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// JSON-RPC over HTTP POST
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    response_tx: mpsc::UnboundedSender<String>,
    response_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<String>>>>,
    error_tx: mpsc::UnboundedSender<PmAgentError>,
    error_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<PmAgentError>>>>,
}

impl HttpTransport {
    /// Create a transport for the given endpoint URL
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with an explicit request timeout
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| PmAgentError::Transport(format!("invalid endpoint URL: {err}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PmAgentError::Http)?;

        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();

        Ok(Self {
            client,
            endpoint,
            response_tx,
            response_rx: Arc::new(Mutex::new(Some(response_rx))),
            error_tx,
            error_rx: Arc::new(Mutex::new(Some(error_rx))),
        })
    }

    /// The endpoint this transport posts to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, message: String) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(message)
            .send()
            .await
            .map_err(PmAgentError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PmAgentError::Authentication(format!(
                "server rejected request: {status}"
            ))
            .into());
        }
        // Notifications are acknowledged without a body
        if status == StatusCode::ACCEPTED || status == StatusCode::NO_CONTENT {
            return Ok(());
        }
        if status.is_success() {
            let body = response.text().await.map_err(PmAgentError::Http)?;
            if !body.trim().is_empty() {
                let _ = self.response_tx.send(body);
            }
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let _ = self
            .error_tx
            .send(PmAgentError::Transport(format!("HTTP {status}: {body}")));
        Err(PmAgentError::Transport(format!("HTTP {status}: {body}")).into())
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
