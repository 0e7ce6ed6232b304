//! huelink Command Relay
//!
//! Dispatches inbound device commands, runs the hub round-trips, and
//! reports results back over the device link under the bounded-retry
//! delivery protocol.

pub mod relay;

pub use relay::CommandRelay;
