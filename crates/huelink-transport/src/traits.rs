//! Transport trait definitions

use async_trait::async_trait;
use bytes::Bytes;
use huelink_core::DeviceMessage;

use crate::error::Result;

/// One-shot REST calls against the hub
///
/// Every failure mode collapses to `None`: no route to the hub, a timeout,
/// a non-2xx status, a dropped body. Callers treat `None` exactly like a
/// hub-reported error, so no variant of failure escapes as an `Err`.
#[async_trait]
pub trait HubTransport: Send + Sync {
    /// GET a resource, resolving to the raw reply body
    async fn get(&self, url: &str) -> Option<Bytes>;

    /// PUT a JSON body, resolving to the raw reply body
    async fn put(&self, url: &str, body: serde_json::Value) -> Option<Bytes>;

    /// POST a JSON body, resolving to the raw reply body
    async fn post(&self, url: &str, body: serde_json::Value) -> Option<Bytes>;
}

/// Sending half of the device link
#[async_trait]
pub trait DeviceSender: Send + Sync {
    /// Deliver one message. `Err` means the delivery was not acknowledged
    /// and the caller may retry with the same payload.
    async fn deliver(&self, message: &DeviceMessage) -> Result<()>;
}

/// Receiving half of the device link
#[async_trait]
pub trait DeviceReceiver: Send {
    /// Receive the next inbound message. `None` when the link is closed.
    async fn recv(&mut self) -> Option<DeviceMessage>;
}
