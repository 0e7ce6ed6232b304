//! Hub HTTP client
//!
//! Thin reqwest wrapper implementing [`HubTransport`]. A request that
//! fails for any reason resolves to `None` after a debug log; status and
//! body interpretation belong to the caller.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::HubTransport;

/// reqwest-backed hub transport
pub struct HttpHub {
    client: reqwest::Client,
}

impl HttpHub {
    /// Build a client with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    async fn resolve(request: reqwest::RequestBuilder) -> Option<Bytes> {
        match request.send().await {
            Ok(reply) if reply.status().is_success() => match reply.bytes().await {
                Ok(body) => Some(body),
                Err(e) => {
                    debug!("hub reply body unreadable: {}", e);
                    None
                }
            },
            Ok(reply) => {
                debug!("hub answered with status {}", reply.status());
                None
            }
            Err(e) => {
                debug!("hub request failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl HubTransport for HttpHub {
    async fn get(&self, url: &str) -> Option<Bytes> {
        Self::resolve(self.client.get(url)).await
    }

    async fn put(&self, url: &str, body: serde_json::Value) -> Option<Bytes> {
        Self::resolve(self.client.put(url).json(&body)).await
    }

    async fn post(&self, url: &str, body: serde_json::Value) -> Option<Bytes> {
        Self::resolve(self.client.post(url).json(&body)).await
    }
}
