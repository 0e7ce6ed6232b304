//! Settings file handling
//!
//! A small TOML file holds the bridge configuration between runs. `pair`
//! writes the issued credential back here, so a paired hub survives
//! reboots on the CLI side even before the device has persisted it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use huelink_core::BridgeConfig;

fn default_timeout_secs() -> u64 {
    10
}

/// Persisted CLI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Hub address (host or IP, scheme optional)
    pub address: Option<String>,
    /// Credential issued by the hub during pairing
    pub credential: Option<String>,
    /// Identifier of the light to control
    pub light_id: Option<String>,
    /// Per-request timeout for hub calls
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: None,
            credential: None,
            light_id: None,
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl Settings {
    /// Default settings location under the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("huelink").join("config.toml"))
    }

    /// Load settings, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings in {}", path.display()))
    }

    /// Write settings back, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write settings to {}", path.display()))
    }

    /// Bridge configuration carried by these settings
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            address: self.address.clone(),
            credential: self.credential.clone(),
            light_id: self.light_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_is_absent() {
        let settings = Settings::load(Path::new("/nonexistent/huelink.toml")).unwrap();
        assert!(settings.address.is_none());
        assert_eq!(settings.request_timeout_secs, 10);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str(r#"address = "192.168.1.2""#).unwrap();
        assert_eq!(settings.address.as_deref(), Some("192.168.1.2"));
        assert!(settings.credential.is_none());
        assert_eq!(settings.request_timeout_secs, 10);
    }

    #[test]
    fn test_round_trip() {
        let settings = Settings {
            address: Some("bridge".to_string()),
            credential: Some("user1".to_string()),
            light_id: Some("3".to_string()),
            request_timeout_secs: 5,
        };
        let raw = toml::to_string_pretty(&settings).unwrap();
        let back: Settings = toml::from_str(&raw).unwrap();
        assert_eq!(back.address.as_deref(), Some("bridge"));
        assert_eq!(back.credential.as_deref(), Some("user1"));
        assert_eq!(back.light_id.as_deref(), Some("3"));
        assert_eq!(back.request_timeout_secs, 5);
    }
}
