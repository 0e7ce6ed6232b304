//! huelink Transports
//!
//! Capability interfaces toward the two peers, with one implementation
//! each:
//! - [`HubTransport`] for hub REST calls, backed by [`HttpHub`]
//! - [`DeviceSender`]/[`DeviceReceiver`] for device-link messages, backed
//!   by an in-process channel pair ([`channel::link`])

pub mod channel;
pub mod error;
pub mod http;
pub mod traits;

pub use channel::{link, ChannelReceiver, ChannelSender, LinkEndpoint};
pub use error::{Result, TransportError};
pub use http::HttpHub;
pub use traits::{DeviceReceiver, DeviceSender, HubTransport};
