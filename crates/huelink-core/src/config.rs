//! Process-wide configuration cache
//!
//! Holds the three fields the relay needs to reach the hub. Writes are
//! field-level overwrites, last write wins; completeness gates every hub
//! operation.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hub;

/// Configuration field names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Address,
    Credential,
    LightId,
}

impl ConfigField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigField::Address => "address",
            ConfigField::Credential => "credential",
            ConfigField::LightId => "light_id",
        }
    }
}

/// Hub connection settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub light_id: Option<String>,
}

impl BridgeConfig {
    /// All three fields set to non-empty values
    pub fn is_complete(&self) -> bool {
        self.endpoint().is_some()
    }

    /// The fully-resolved hub endpoint, if configuration is complete
    pub fn endpoint(&self) -> Option<HubEndpoint> {
        let address = self.address.as_deref().filter(|s| !s.is_empty())?;
        let credential = self.credential.as_deref().filter(|s| !s.is_empty())?;
        let light_id = self.light_id.as_deref().filter(|s| !s.is_empty())?;
        Some(HubEndpoint {
            address: address.to_string(),
            credential: credential.to_string(),
            light_id: light_id.to_string(),
        })
    }

    /// Overwrite one field
    pub fn set(&mut self, field: ConfigField, value: String) {
        let slot = match field {
            ConfigField::Address => &mut self.address,
            ConfigField::Credential => &mut self.credential,
            ConfigField::LightId => &mut self.light_id,
        };
        *slot = Some(value);
    }
}

/// Addressing for one light behind one registered hub
#[derive(Debug, Clone, PartialEq)]
pub struct HubEndpoint {
    pub address: String,
    pub credential: String,
    pub light_id: String,
}

impl HubEndpoint {
    /// URL for reading the light
    pub fn light_url(&self) -> String {
        hub::light_url(&self.address, &self.credential, &self.light_id)
    }

    /// URL for writing the light state
    pub fn state_url(&self) -> String {
        hub::light_state_url(&self.address, &self.credential, &self.light_id)
    }

    /// Success-map key confirming an `on` write
    pub fn state_on_path(&self) -> String {
        hub::state_on_path(&self.light_id)
    }
}

/// Shared, last-write-wins configuration cache
///
/// One instance per process, shared through an `Arc`. Mutated only by
/// explicit set operations: pairing success and inbound configuration
/// messages. No reachability validation happens here.
#[derive(Debug, Default)]
pub struct ConfigCache {
    inner: RwLock<BridgeConfig>,
}

impl ConfigCache {
    pub fn new(initial: BridgeConfig) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    /// All fields present and non-empty
    pub fn is_complete(&self) -> bool {
        self.inner.read().is_complete()
    }

    /// Resolved endpoint, when complete
    pub fn endpoint(&self) -> Option<HubEndpoint> {
        self.inner.read().endpoint()
    }

    /// Overwrite one field
    pub fn set(&self, field: ConfigField, value: impl Into<String>) {
        debug!("configuration field {} updated", field.as_str());
        self.inner.write().set(field, value.into());
    }

    /// Copy of the current configuration
    pub fn snapshot(&self) -> BridgeConfig {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_until_every_field_is_set() {
        let cache = ConfigCache::default();
        assert!(!cache.is_complete());

        cache.set(ConfigField::Address, "192.168.1.2");
        cache.set(ConfigField::Credential, "user1");
        assert!(!cache.is_complete());
        assert!(cache.endpoint().is_none());

        cache.set(ConfigField::LightId, "3");
        assert!(cache.is_complete());
    }

    #[test]
    fn test_empty_value_does_not_complete() {
        let cache = ConfigCache::default();
        cache.set(ConfigField::Address, "192.168.1.2");
        cache.set(ConfigField::Credential, "");
        cache.set(ConfigField::LightId, "3");
        assert!(!cache.is_complete());
    }

    #[test]
    fn test_last_write_wins() {
        let cache = ConfigCache::default();
        cache.set(ConfigField::Address, "first");
        cache.set(ConfigField::Address, "second");
        assert_eq!(cache.snapshot().address.as_deref(), Some("second"));
    }

    #[test]
    fn test_endpoint_urls() {
        let cache = ConfigCache::new(BridgeConfig {
            address: Some("bridge".to_string()),
            credential: Some("user1".to_string()),
            light_id: Some("3".to_string()),
        });
        let endpoint = cache.endpoint().unwrap();
        assert_eq!(endpoint.light_url(), "http://bridge/api/user1/lights/3");
        assert_eq!(
            endpoint.state_url(),
            "http://bridge/api/user1/lights/3/state"
        );
        assert_eq!(endpoint.state_on_path(), "/lights/3/state/on");
    }
}
