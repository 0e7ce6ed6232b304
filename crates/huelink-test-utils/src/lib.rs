//! Common test helpers and utilities for huelink tests
//!
//! This crate provides:
//! - A scripted hub with per-route reply queues and a request log
//! - A recording device link with a scriptable nack schedule
//! - Condition-based waiting (no hardcoded sleeps)
//! - Hub payload builders for the common reply shapes

use async_trait::async_trait;
use bytes::Bytes;
use huelink_core::DeviceMessage;
use huelink_transport::{DeviceSender, TransportError};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check() {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

// ============================================================================
// Scripted Hub
// ============================================================================

/// HTTP method of a scripted route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
}

/// One request the scripted hub saw
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    /// JSON body for PUT/POST requests
    pub body: Option<serde_json::Value>,
}

#[derive(Default)]
struct HubScript {
    replies: HashMap<(Method, String), VecDeque<Option<Bytes>>>,
    log: Vec<RecordedRequest>,
}

/// A hub transport that answers from scripted per-route reply queues
///
/// Each `script` call enqueues one reply for one (method, url) route;
/// requests pop from the front. A request against an unscripted or
/// exhausted route resolves to `None`, which is exactly how a dead hub
/// looks to the relay. Clones share the script and the log.
#[derive(Clone, Default)]
pub struct ScriptedHub {
    inner: Arc<Mutex<HubScript>>,
}

impl ScriptedHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue one successful reply for a route
    pub fn script(&self, method: Method, url: &str, reply: impl Into<Bytes>) {
        self.inner
            .lock()
            .replies
            .entry((method, url.to_string()))
            .or_default()
            .push_back(Some(reply.into()));
    }

    /// Enqueue one transport failure for a route
    pub fn script_failure(&self, method: Method, url: &str) {
        self.inner
            .lock()
            .replies
            .entry((method, url.to_string()))
            .or_default()
            .push_back(None);
    }

    /// Every request seen so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().log.clone()
    }

    /// Requests seen on one route
    pub fn request_count(&self, method: Method, url: &str) -> usize {
        self.inner
            .lock()
            .log
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    /// Requests seen across all routes
    pub fn total_requests(&self) -> usize {
        self.inner.lock().log.len()
    }

    fn take(&self, method: Method, url: &str, body: Option<serde_json::Value>) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        inner.log.push(RecordedRequest {
            method,
            url: url.to_string(),
            body,
        });
        inner
            .replies
            .get_mut(&(method, url.to_string()))
            .and_then(|queue| queue.pop_front())
            .flatten()
    }
}

#[async_trait]
impl huelink_transport::HubTransport for ScriptedHub {
    async fn get(&self, url: &str) -> Option<Bytes> {
        self.take(Method::Get, url, None)
    }

    async fn put(&self, url: &str, body: serde_json::Value) -> Option<Bytes> {
        self.take(Method::Put, url, Some(body))
    }

    async fn post(&self, url: &str, body: serde_json::Value) -> Option<Bytes> {
        self.take(Method::Post, url, Some(body))
    }
}

// ============================================================================
// Recording Device Link
// ============================================================================

#[derive(Default)]
struct LinkRecord {
    delivered: Vec<DeviceMessage>,
    attempts: u32,
    fail_remaining: u32,
    fail_always: bool,
}

/// A device sender that records deliveries and nacks on a schedule
///
/// Every `deliver` call counts as an attempt; nacked attempts record
/// nothing in the delivered log. Clones share the record.
#[derive(Clone, Default)]
pub struct RecordingDeviceLink {
    inner: Arc<Mutex<LinkRecord>>,
}

impl RecordingDeviceLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nack the next `n` delivery attempts
    pub fn fail_next(&self, n: u32) {
        self.inner.lock().fail_remaining = n;
    }

    /// Nack every delivery attempt from now on
    pub fn fail_always(&self) {
        self.inner.lock().fail_always = true;
    }

    /// Messages acknowledged so far, in delivery order
    pub fn delivered(&self) -> Vec<DeviceMessage> {
        self.inner.lock().delivered.clone()
    }

    /// Acknowledged deliveries
    pub fn delivered_count(&self) -> usize {
        self.inner.lock().delivered.len()
    }

    /// Delivery attempts, acknowledged or not
    pub fn attempts(&self) -> u32 {
        self.inner.lock().attempts
    }

    /// Wait until at least `n` messages were acknowledged
    pub async fn wait_for_delivered(&self, n: usize, max_wait: Duration) -> bool {
        wait_for(
            || self.delivered_count() >= n,
            DEFAULT_CHECK_INTERVAL,
            max_wait,
        )
        .await
    }
}

#[async_trait]
impl DeviceSender for RecordingDeviceLink {
    async fn deliver(&self, message: &DeviceMessage) -> huelink_transport::Result<()> {
        let mut inner = self.inner.lock();
        inner.attempts += 1;
        if inner.fail_always {
            return Err(TransportError::DeliveryRefused);
        }
        if inner.fail_remaining > 0 {
            inner.fail_remaining -= 1;
            return Err(TransportError::DeliveryRefused);
        }
        inner.delivered.push(message.clone());
        Ok(())
    }
}

// ============================================================================
// Hub Payload Builders
// ============================================================================

/// `GET .../lights/<id>` reply body
pub fn light_body(on: bool, bri: u16) -> Bytes {
    serde_json::json!({
        "state": { "on": on, "bri": bri, "reachable": true },
        "type": "Dimmable light",
        "name": "Test light"
    })
    .to_string()
    .into()
}

/// `PUT .../state {on}` success reply body
pub fn state_ack_body(light_id: &str, on: bool) -> Bytes {
    let path = format!("/lights/{}/state/on", light_id);
    serde_json::json!([{ "success": { path: on } }])
        .to_string()
        .into()
}

/// `PUT .../state {bri}` success reply body
pub fn brightness_ack_body(light_id: &str, bri: u16) -> Bytes {
    let path = format!("/lights/{}/state/bri", light_id);
    serde_json::json!([{ "success": { path: bri } }])
        .to_string()
        .into()
}

/// One-element error array, the hub's shape for every refusal
pub fn hub_error_body(code: i64, description: &str) -> Bytes {
    serde_json::json!([{
        "error": { "type": code, "address": "/", "description": description }
    }])
    .to_string()
    .into()
}

/// Registration refusal while the link button has not been pressed
pub fn link_button_body() -> Bytes {
    hub_error_body(101, "link button not pressed")
}

/// Registration success issuing a credential
pub fn registration_success_body(username: &str) -> Bytes {
    serde_json::json!([{ "success": { "username": username } }])
        .to_string()
        .into()
}

/// Full bridge state, as returned to a registered credential
pub fn bridge_state_body() -> Bytes {
    serde_json::json!({
        "lights": {},
        "config": { "name": "Test bridge", "swversion": "01041302" }
    })
    .to_string()
    .into()
}
