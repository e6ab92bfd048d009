use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;

use crate::{
    decode::{body_excerpt, decode_response},
    wire::RpcRequest,
    RelayError, Result,
};

/// Single-shot JSON-RPC submission against one endpoint.
///
/// Implementations must not retry and must not pick endpoints; that is the
/// job of [`Relay`](crate::Relay).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `payload` as the only parameter of `method` to `endpoint`.
    ///
    /// Returns the decoded `result` member when the endpoint accepts the
    /// call without an RPC error.
    async fn submit(
        &self,
        endpoint: &str,
        method: &str,
        payload: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value>;
}

/// JSON-RPC over HTTP POST, backed by `reqwest`.
pub struct HttpTransport {
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Wraps a preconfigured `reqwest` client (proxies, TLS roots, ...).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            next_id: AtomicU64::new(1),
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(
        &self,
        endpoint: &str,
        method: &str,
        payload: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let id = self.next_request_id();
        let request = RpcRequest::new(id, method, payload);

        let response = self
            .http
            .post(endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(RelayError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(RelayError::Transport)?;

        if status.is_success() {
            return decode_response(&body, id);
        }

        // Nodes commonly answer RPC rejections with 4xx/5xx and a valid envelope.
        match decode_response(&body, id) {
            Err(err @ RelayError::Rpc { .. }) => Err(err),
            _ => Err(RelayError::Http {
                status: status.as_u16(),
                body: body_excerpt(&body),
            }),
        }
    }
}
