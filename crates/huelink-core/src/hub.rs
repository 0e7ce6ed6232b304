//! Hub REST payload decoding and endpoint paths
//!
//! The hub answers light reads with a nested state object, and answers
//! writes and registrations with a one-element array carrying either a
//! `success` map or an `error` object. Everything is decoded once, here,
//! so callers never touch raw JSON.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::light::LightState;
use crate::LINK_BUTTON_ERROR;

/// Light resource as returned by `GET .../lights/<id>`
#[derive(Debug, Clone, Deserialize)]
pub struct LightSnapshot {
    pub state: LightState,
}

/// Error object embedded in hub replies
#[derive(Debug, Clone, Deserialize)]
pub struct HubError {
    #[serde(rename = "type")]
    pub code: i64,
    #[serde(default)]
    pub description: String,
}

/// Decoded write acknowledgment
#[derive(Debug, Clone)]
pub enum HubAck {
    /// Success map keyed by the written path, e.g. `/lights/1/state/on`
    Success(serde_json::Map<String, Value>),
    Error(HubError),
}

impl HubAck {
    /// Confirmed boolean for a written path, if the hub echoed one
    pub fn confirmed_bool(&self, path: &str) -> Option<bool> {
        match self {
            HubAck::Success(fields) => fields.get(path).and_then(Value::as_bool),
            HubAck::Error(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AckItem {
    #[serde(default)]
    success: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    error: Option<HubError>,
}

impl AckItem {
    fn first(body: &[u8]) -> Result<Self> {
        let items: Vec<AckItem> = serde_json::from_slice(body)?;
        items.into_iter().next().ok_or(Error::EmptyReply)
    }
}

/// Decode a light read reply
pub fn decode_light(body: &[u8]) -> Result<LightSnapshot> {
    Ok(serde_json::from_slice(body)?)
}

/// Decode a state write reply
pub fn decode_ack(body: &[u8]) -> Result<HubAck> {
    let item = AckItem::first(body)?;
    if let Some(fields) = item.success {
        return Ok(HubAck::Success(fields));
    }
    if let Some(error) = item.error {
        return Ok(HubAck::Error(error));
    }
    Err(Error::MalformedReply(
        "neither success nor error".to_string(),
    ))
}

/// Result of a registration POST
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationReply {
    /// Hub accepted and issued (or confirmed) a credential
    Issued { username: String },
    /// Link button has not been pressed yet; ask again after a pause
    LinkButtonPending,
    /// Hub refused the registration
    Failed { code: i64, description: String },
}

/// Decode a registration reply
pub fn decode_registration(body: &[u8]) -> Result<RegistrationReply> {
    let item = AckItem::first(body)?;
    if let Some(fields) = item.success {
        let username = fields
            .get("username")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedReply("success without username".to_string()))?;
        return Ok(RegistrationReply::Issued {
            username: username.to_string(),
        });
    }
    if let Some(error) = item.error {
        if error.code == LINK_BUTTON_ERROR {
            return Ok(RegistrationReply::LinkButtonPending);
        }
        return Ok(RegistrationReply::Failed {
            code: error.code,
            description: error.description,
        });
    }
    Err(Error::MalformedReply(
        "neither success nor error".to_string(),
    ))
}

/// Whether a credential-existence probe found a registered user
///
/// A registered credential gets the full bridge state back, which always
/// carries a `config` key; an unknown credential gets an error array.
pub fn has_config_key(body: &[u8]) -> bool {
    serde_json::from_slice::<Value>(body)
        .map(|v| v.get("config").is_some())
        .unwrap_or(false)
}

/// Normalize a user-supplied address to a base URL
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// `<address>/api/` - reachability probe and registration endpoint
pub fn api_root(address: &str) -> String {
    format!("{}/api/", normalize_address(address))
}

/// `<address>/api/<user>/` - credential existence probe
pub fn user_root(address: &str, credential: &str) -> String {
    format!("{}/api/{}/", normalize_address(address), credential)
}

/// `<address>/api/<user>/lights/<id>` - light read
pub fn light_url(address: &str, credential: &str, light_id: &str) -> String {
    format!(
        "{}/api/{}/lights/{}",
        normalize_address(address),
        credential,
        light_id
    )
}

/// `<address>/api/<user>/lights/<id>/state` - state write
pub fn light_state_url(address: &str, credential: &str, light_id: &str) -> String {
    format!("{}/state", light_url(address, credential, light_id))
}

/// Success-map key the hub uses to confirm an `on` write
pub fn state_on_path(light_id: &str) -> String {
    format!("/lights/{}/state/on", light_id)
}
