//! huelink Core
//!
//! Core types and shared state for the huelink relay.
//!
//! This crate provides:
//! - Device message payloads and keys ([`DeviceMessage`], [`MessageKey`])
//! - Hub reply decoding ([`hub`])
//! - Brightness scale conversion ([`light`])
//! - The process-wide configuration cache ([`ConfigCache`])

pub mod config;
pub mod error;
pub mod hub;
pub mod light;
pub mod message;

pub use config::{BridgeConfig, ConfigCache, ConfigField, HubEndpoint};
pub use error::{Error, Result};
pub use hub::{HubAck, HubError, LightSnapshot, RegistrationReply};
pub use light::{to_device_scale, to_hub_scale, LightState};
pub use message::{DeviceMessage, MessageKey, MessageValue, OutboundKind};

/// Application identifier sent as `devicetype` when registering with a hub
pub const DEVICE_TYPE: &str = "huelink";

/// Hub error type raised until the physical link button is pressed
pub const LINK_BUTTON_ERROR: i64 = 101;

/// Delivery attempts per outbound device message, and configuration
/// requests per cause per boot
pub const MAX_SEND_ATTEMPTS: u32 = 3;

/// Reported in place of an on/off state when a hub round-trip fails
pub const LIGHT_STATE_UNKNOWN: i64 = -1;

/// Top of the hub brightness scale
pub const HUB_BRIGHTNESS_MAX: u16 = 254;

/// Top of the device brightness scale
pub const DEVICE_BRIGHTNESS_MAX: u8 = 99;
