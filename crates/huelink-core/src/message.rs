//! Device message payloads
//!
//! The wearable's message system carries flat key/value dictionaries.
//! Known keys are a closed set with SCREAMING_SNAKE wire names; unknown
//! inbound keys stay representable so dispatch can log and skip them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Keys understood on the device link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Inbound: toggle request. Outbound: reported on/off state (0, 1, or -1)
    LightState,
    /// Inbound: set brightness. Outbound: reported brightness (device scale)
    Brightness,
    /// Hub address configuration field
    BridgeAddress,
    /// Hub credential configuration field
    BridgeCredential,
    /// Target light configuration field
    LightId,
    /// Outbound only: ask the device to push its stored configuration
    ConfigRequest,
}

impl MessageKey {
    /// Wire name for this key
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::LightState => "LIGHT_STATE",
            MessageKey::Brightness => "BRIGHTNESS",
            MessageKey::BridgeAddress => "BRIDGE_ADDRESS",
            MessageKey::BridgeCredential => "BRIDGE_CREDENTIAL",
            MessageKey::LightId => "LIGHT_ID",
            MessageKey::ConfigRequest => "CONFIG_REQUEST",
        }
    }

    /// Resolve a wire name to a known key
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "LIGHT_STATE" => Some(MessageKey::LightState),
            "BRIGHTNESS" => Some(MessageKey::Brightness),
            "BRIDGE_ADDRESS" => Some(MessageKey::BridgeAddress),
            "BRIDGE_CREDENTIAL" => Some(MessageKey::BridgeCredential),
            "LIGHT_ID" => Some(MessageKey::LightId),
            "CONFIG_REQUEST" => Some(MessageKey::ConfigRequest),
            _ => None,
        }
    }
}

/// Value slot in a device message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageValue {
    Int(i64),
    Text(String),
}

impl MessageValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MessageValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MessageValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MessageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageValue::Int(i) => write!(f, "{}", i),
            MessageValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for MessageValue {
    fn from(v: i64) -> Self {
        MessageValue::Int(v)
    }
}

impl From<String> for MessageValue {
    fn from(v: String) -> Self {
        MessageValue::Text(v)
    }
}

impl From<&str> for MessageValue {
    fn from(v: &str) -> Self {
        MessageValue::Text(v.to_string())
    }
}

/// One flat key/value payload on the device link
///
/// Status reports carry a single key; configuration requests add an echo
/// of the command that triggered them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceMessage {
    entries: HashMap<String, MessageValue>,
}

impl DeviceMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a message carrying one known key
    pub fn single(key: MessageKey, value: impl Into<MessageValue>) -> Self {
        let mut message = Self::new();
        message.insert(key, value);
        message
    }

    /// Set a known key
    pub fn insert(&mut self, key: MessageKey, value: impl Into<MessageValue>) {
        self.entries.insert(key.as_str().to_string(), value.into());
    }

    /// Look up a known key
    pub fn value_of(&self, key: MessageKey) -> Option<&MessageValue> {
        self.entries.get(key.as_str())
    }

    /// Iterate raw entries, unknown keys included
    pub fn entries(&self) -> impl Iterator<Item = (&str, &MessageValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outbound message families tracked by the delivery retry counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundKind {
    /// On/off confirmation after a toggle
    StateReport,
    /// Brightness readback
    BrightnessReport,
    /// Configuration field pushed to the device
    ConfigPush,
    /// Request for missing configuration
    ConfigRequest,
}

impl OutboundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundKind::StateReport => "state-report",
            OutboundKind::BrightnessReport => "brightness-report",
            OutboundKind::ConfigPush => "configuration-push",
            OutboundKind::ConfigRequest => "configuration-request",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_wire_names_round_trip() {
        let keys = [
            MessageKey::LightState,
            MessageKey::Brightness,
            MessageKey::BridgeAddress,
            MessageKey::BridgeCredential,
            MessageKey::LightId,
            MessageKey::ConfigRequest,
        ];
        for key in keys {
            assert_eq!(MessageKey::from_wire(key.as_str()), Some(key));
        }
        assert_eq!(MessageKey::from_wire("VOLUME"), None);
    }

    #[test]
    fn test_single_key_json_shape() {
        let message = DeviceMessage::single(MessageKey::LightState, 1);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, serde_json::json!({ "LIGHT_STATE": 1 }));
    }

    #[test]
    fn test_unknown_keys_survive_decode() {
        let message: DeviceMessage =
            serde_json::from_value(serde_json::json!({ "VOLUME": 5 })).unwrap();
        let entries: Vec<_> = message.entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "VOLUME");
        assert_eq!(entries[0].1.as_i64(), Some(5));
    }

    #[test]
    fn test_untagged_values() {
        let message: DeviceMessage =
            serde_json::from_value(serde_json::json!({ "BRIDGE_ADDRESS": "192.168.1.2" }))
                .unwrap();
        let address = message
            .value_of(MessageKey::BridgeAddress)
            .and_then(|v| v.as_str());
        assert_eq!(address, Some("192.168.1.2"));
    }

    #[test]
    fn test_echo_rides_alongside_request() {
        let mut message = DeviceMessage::single(MessageKey::ConfigRequest, 0);
        message.insert(MessageKey::Brightness, 40);
        assert_eq!(message.len(), 2);
        assert_eq!(
            message.value_of(MessageKey::Brightness).and_then(|v| v.as_i64()),
            Some(40)
        );
    }
}
