//! Command relay core
//!
//! Nothing here returns an error to the caller: every failure resolves to
//! a log line plus, where the protocol has one, a sentinel status report.
//! A failed hub call is never retried; recovery is the next user-triggered
//! command.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use huelink_core::{
    hub, to_device_scale, to_hub_scale, ConfigCache, ConfigField, DeviceMessage, HubAck,
    HubEndpoint, MessageKey, MessageValue, OutboundKind, DEVICE_BRIGHTNESS_MAX,
    LIGHT_STATE_UNKNOWN, MAX_SEND_ATTEMPTS,
};
use huelink_transport::{DeviceReceiver, DeviceSender, HubTransport};

/// Relays commands between the device link and the hub
pub struct CommandRelay<H, S> {
    hub: H,
    device: S,
    config: Arc<ConfigCache>,
    /// Brightness asked for before configuration was complete
    pending_brightness: Mutex<Option<u8>>,
    /// Delivery retry counters, one per outbound kind
    retries: Mutex<HashMap<OutboundKind, u32>>,
    /// Configuration requests already sent, per triggering command
    config_requests: Mutex<HashMap<MessageKey, u32>>,
}

impl<H, S> CommandRelay<H, S>
where
    H: HubTransport,
    S: DeviceSender,
{
    pub fn new(hub: H, device: S, config: Arc<ConfigCache>) -> Self {
        Self {
            hub,
            device,
            config,
            pending_brightness: Mutex::new(None),
            retries: Mutex::new(HashMap::new()),
            config_requests: Mutex::new(HashMap::new()),
        }
    }

    /// Shared configuration cache
    pub fn config(&self) -> &Arc<ConfigCache> {
        &self.config
    }

    /// Drive the relay from a device receiver
    ///
    /// Each message dispatches on its own task so a slow hub round-trip
    /// does not block the next command.
    pub async fn serve<R>(self: Arc<Self>, mut device_rx: R)
    where
        R: DeviceReceiver,
        H: 'static,
        S: 'static,
    {
        info!("command relay serving device link");
        while let Some(message) = device_rx.recv().await {
            let relay = Arc::clone(&self);
            tokio::spawn(async move {
                relay.on_device_message(message).await;
            });
        }
        info!("device link closed, relay stopping");
    }

    /// Dispatch one inbound device message by key
    pub async fn on_device_message(&self, message: DeviceMessage) {
        for (name, value) in message.entries() {
            match MessageKey::from_wire(name) {
                Some(MessageKey::LightState) => self.handle_toggle().await,
                Some(MessageKey::Brightness) => match value.as_i64() {
                    Some(level) => {
                        let level = level.clamp(0, DEVICE_BRIGHTNESS_MAX as i64) as u8;
                        self.handle_brightness(level).await;
                    }
                    None => warn!("brightness command without a numeric level"),
                },
                Some(MessageKey::BridgeAddress) => {
                    self.apply_config(ConfigField::Address, value).await;
                }
                Some(MessageKey::BridgeCredential) => {
                    self.apply_config(ConfigField::Credential, value).await;
                }
                Some(MessageKey::LightId) => {
                    self.apply_config(ConfigField::LightId, value).await;
                }
                _ => warn!("no inbound handling for device message key {}", name),
            }
        }
    }

    /// Toggle the configured light and report the confirmed state
    ///
    /// Reads the current state, writes the opposite, and forwards the
    /// hub-confirmed value. Either leg failing reports the unknown-state
    /// sentinel instead.
    pub async fn handle_toggle(&self) {
        let Some(endpoint) = self.config.endpoint() else {
            debug!("toggle requested before configuration is complete");
            self.request_configuration(MessageKey::LightState, MessageValue::Int(1))
                .await;
            return;
        };

        let Some(current) = self.read_light_on(&endpoint).await else {
            self.report_light_state(LIGHT_STATE_UNKNOWN).await;
            return;
        };

        let desired = !current;
        debug!("toggling light {} to on={}", endpoint.light_id, desired);
        let reply = self
            .hub
            .put(&endpoint.state_url(), serde_json::json!({ "on": desired }))
            .await;

        let confirmed = match reply {
            Some(body) => match hub::decode_ack(&body) {
                Ok(ack @ HubAck::Success(_)) => ack.confirmed_bool(&endpoint.state_on_path()),
                Ok(HubAck::Error(error)) => {
                    warn!(
                        "hub refused state write: {} (type {})",
                        error.description, error.code
                    );
                    None
                }
                Err(e) => {
                    warn!(
                        "unreadable state ack: {} (raw: {})",
                        e,
                        String::from_utf8_lossy(&body)
                    );
                    None
                }
            },
            None => {
                warn!("state write got no reply from hub");
                None
            }
        };

        match confirmed {
            Some(on) => {
                self.report_light_state(on as i64).await;
                if on {
                    self.report_current_brightness(&endpoint).await;
                }
            }
            None => self.report_light_state(LIGHT_STATE_UNKNOWN).await,
        }
    }

    /// Set the light to a device-scale brightness level
    ///
    /// Success needs no device echo. Before configuration is complete the
    /// level is remembered and replayed once the cache fills up.
    pub async fn handle_brightness(&self, level: u8) {
        let Some(endpoint) = self.config.endpoint() else {
            debug!("brightness requested before configuration is complete");
            *self.pending_brightness.lock() = Some(level);
            self.request_configuration(MessageKey::Brightness, MessageValue::Int(level as i64))
                .await;
            return;
        };

        let hub_level = to_hub_scale(level);
        debug!(
            "setting light {} brightness to {} ({} device scale)",
            endpoint.light_id, hub_level, level
        );
        let reply = self
            .hub
            .put(&endpoint.state_url(), serde_json::json!({ "bri": hub_level }))
            .await;

        match reply {
            Some(body) => match hub::decode_ack(&body) {
                Ok(HubAck::Success(_)) => {}
                Ok(HubAck::Error(error)) => warn!(
                    "hub refused brightness write: {} (type {})",
                    error.description, error.code
                ),
                Err(e) => warn!(
                    "unreadable brightness ack: {} (raw: {})",
                    e,
                    String::from_utf8_lossy(&body)
                ),
            },
            None => warn!("brightness write got no reply from hub"),
        }
    }

    /// Report an on/off state (1, 0, or -1 when unknown) to the device
    pub async fn report_light_state(&self, state: i64) {
        let message = DeviceMessage::single(MessageKey::LightState, state);
        self.send_with_retry(OutboundKind::StateReport, message).await;
    }

    /// Report a device-scale brightness to the device
    pub async fn report_light_brightness(&self, level: u8) {
        let message = DeviceMessage::single(MessageKey::Brightness, level as i64);
        self.send_with_retry(OutboundKind::BrightnessReport, message)
            .await;
    }

    /// Push every populated configuration field to the device
    ///
    /// One message per field, so the device can persist a pairing result
    /// delivered out of band.
    pub async fn push_configuration(&self) {
        let snapshot = self.config.snapshot();
        let fields = [
            (MessageKey::BridgeAddress, snapshot.address),
            (MessageKey::BridgeCredential, snapshot.credential),
            (MessageKey::LightId, snapshot.light_id),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                let message = DeviceMessage::single(key, value);
                self.send_with_retry(OutboundKind::ConfigPush, message).await;
            }
        }
    }

    async fn read_light_on(&self, endpoint: &HubEndpoint) -> Option<bool> {
        let Some(body) = self.hub.get(&endpoint.light_url()).await else {
            warn!("light read got no reply from hub");
            return None;
        };
        match hub::decode_light(&body) {
            Ok(snapshot) => Some(snapshot.state.on),
            Err(e) => {
                warn!(
                    "unreadable light snapshot: {} (raw: {})",
                    e,
                    String::from_utf8_lossy(&body)
                );
                None
            }
        }
    }

    /// Read the light once more and report its brightness, so the device
    /// slider matches reality after a toggle to on
    async fn report_current_brightness(&self, endpoint: &HubEndpoint) {
        let Some(body) = self.hub.get(&endpoint.light_url()).await else {
            debug!("brightness readback got no reply from hub");
            return;
        };
        match hub::decode_light(&body) {
            Ok(snapshot) => {
                if let Some(bri) = snapshot.state.bri {
                    self.report_light_brightness(to_device_scale(bri)).await;
                }
            }
            Err(e) => debug!("unreadable brightness readback: {}", e),
        }
    }

    /// Ask the device to push configuration, echoing the triggering
    /// command so the device can replay it afterwards
    ///
    /// Capped per cause, so an unconfigured boot cannot loop forever.
    async fn request_configuration(&self, cause: MessageKey, echo: MessageValue) {
        {
            let mut requests = self.config_requests.lock();
            let count = requests.entry(cause).or_insert(0);
            if *count >= MAX_SEND_ATTEMPTS {
                debug!(
                    "configuration request budget exhausted for {}",
                    cause.as_str()
                );
                return;
            }
            *count += 1;
        }

        info!(
            "requesting configuration from device ({} triggered)",
            cause.as_str()
        );
        let mut message = DeviceMessage::single(MessageKey::ConfigRequest, 0);
        message.insert(cause, echo);
        self.send_with_retry(OutboundKind::ConfigRequest, message)
            .await;
    }

    async fn apply_config(&self, field: ConfigField, value: &MessageValue) {
        self.config.set(field, value.to_string());
        if let Some(level) = self.take_pending_brightness() {
            info!(
                "configuration complete, replaying pending brightness {}",
                level
            );
            self.handle_brightness(level).await;
        }
    }

    fn take_pending_brightness(&self) -> Option<u8> {
        if !self.config.is_complete() {
            return None;
        }
        self.pending_brightness.lock().take()
    }

    /// Deliver with the bounded retry protocol
    ///
    /// The per-kind counter resets on acknowledgment; once a message has
    /// consumed its attempts it is dropped without surfacing an error.
    async fn send_with_retry(&self, kind: OutboundKind, message: DeviceMessage) {
        loop {
            match self.device.deliver(&message).await {
                Ok(()) => {
                    self.retries.lock().insert(kind, 0);
                    debug!("{} delivered", kind.as_str());
                    return;
                }
                Err(e) => {
                    let attempts = {
                        let mut retries = self.retries.lock();
                        let count = retries.entry(kind).or_insert(0);
                        *count += 1;
                        let attempts = *count;
                        if attempts >= MAX_SEND_ATTEMPTS {
                            *count = 0;
                        }
                        attempts
                    };
                    if attempts >= MAX_SEND_ATTEMPTS {
                        warn!(
                            "{} dropped after {} delivery attempts: {}",
                            kind.as_str(),
                            MAX_SEND_ATTEMPTS,
                            e
                        );
                        return;
                    }
                    debug!(
                        "{} delivery attempt {} failed, retrying: {}",
                        kind.as_str(),
                        attempts,
                        e
                    );
                }
            }
        }
    }
}
