//! huelink Pairing
//!
//! One-time registration handshake with the hub: probe the address, probe
//! an existing credential, then POST registrations until the link button
//! is pressed or the run is cancelled.

pub mod controller;

pub use controller::{
    PairingConfig, PairingController, PairingOutcome, PairingUpdate, DEFAULT_POLL_INTERVAL,
};
