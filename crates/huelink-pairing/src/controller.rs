//! Pairing controller
//!
//! Sequenced async probes, never blocking I/O and never recursion. The
//! link-button wait is an explicit poll loop bounded only by external
//! cancellation; every await resolves promptly when the run is cancelled.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use huelink_core::{hub, RegistrationReply, DEVICE_TYPE};
use huelink_transport::HubTransport;

/// Pause between registration attempts while the link button is up
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Settings for one pairing run
#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// Hub address as the user supplied it (scheme optional)
    pub address: String,
    /// Credential to reuse or request, when the user has one
    pub credential: Option<String>,
    /// Application identifier sent as `devicetype`
    pub devicetype: String,
    /// Pause between link-button polls
    pub poll_interval: Duration,
}

impl PairingConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            credential: None,
            devicetype: DEVICE_TYPE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Progress of a pairing run, for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingUpdate {
    /// Probing whether the address answers like a hub
    CheckingAddress,
    /// Address answered
    AddressOk,
    /// Probing whether the supplied credential is already registered
    CheckingCredential,
    /// Asking the hub to issue a credential
    Registering,
    /// Hub is waiting for its link button
    LinkButtonWait { attempt: u32 },
}

/// Terminal result of a pairing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    /// Hub issued (or confirmed) this credential
    Registered { username: String },
    /// The supplied credential was already registered; reuse it as-is
    AlreadyRegistered { username: String },
    /// Run ended without a credential
    Aborted { reason: String },
}

/// Runs the pairing handshake against one hub
pub struct PairingController<H> {
    hub: H,
    config: PairingConfig,
    updates: Option<mpsc::Sender<PairingUpdate>>,
}

impl<H: HubTransport> PairingController<H> {
    pub fn new(hub: H, config: PairingConfig) -> Self {
        Self {
            hub,
            config,
            updates: None,
        }
    }

    /// Subscribe to progress updates; call before [`run`](Self::run)
    pub fn updates(&mut self) -> mpsc::Receiver<PairingUpdate> {
        let (tx, rx) = mpsc::channel(16);
        self.updates = Some(tx);
        rx
    }

    /// Run the handshake to a terminal outcome
    ///
    /// A message on `cancel` aborts the run at the next await point.
    pub async fn run(self, mut cancel: mpsc::Receiver<()>) -> PairingOutcome {
        let address = hub::normalize_address(&self.config.address);
        info!("pairing with hub at {}", address);

        self.emit(PairingUpdate::CheckingAddress).await;
        let api_root = hub::api_root(&address);
        let probe = tokio::select! {
            reply = self.hub.get(&api_root) => reply,
            _ = cancel.recv() => return Self::cancelled(),
        };
        if probe.is_none() {
            warn!("address probe failed for {}", address);
            return PairingOutcome::Aborted {
                reason: "address is not a valid bridge".to_string(),
            };
        }
        self.emit(PairingUpdate::AddressOk).await;

        if let Some(credential) = &self.config.credential {
            self.emit(PairingUpdate::CheckingCredential).await;
            let user_root = hub::user_root(&address, credential);
            let reply = tokio::select! {
                reply = self.hub.get(&user_root) => reply,
                _ = cancel.recv() => return Self::cancelled(),
            };
            match reply {
                Some(body) if hub::has_config_key(&body) => {
                    info!("credential is already registered with the hub");
                    return PairingOutcome::AlreadyRegistered {
                        username: credential.clone(),
                    };
                }
                Some(_) => debug!("credential not registered, moving on to registration"),
                None => debug!("credential probe got no reply, moving on to registration"),
            }
        }

        self.emit(PairingUpdate::Registering).await;
        let body = registration_body(&self.config);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let reply = tokio::select! {
                reply = self.hub.post(&api_root, body.clone()) => reply,
                _ = cancel.recv() => return Self::cancelled(),
            };
            let Some(raw) = reply else {
                warn!("registration attempt {} got no reply from hub", attempt);
                return PairingOutcome::Aborted {
                    reason: "bridge did not answer the registration request".to_string(),
                };
            };

            match hub::decode_registration(&raw) {
                Ok(RegistrationReply::Issued { username }) => {
                    info!("hub issued a credential after {} attempts", attempt);
                    return PairingOutcome::Registered { username };
                }
                Ok(RegistrationReply::LinkButtonPending) => {
                    debug!("link button not pressed yet (attempt {})", attempt);
                    self.emit(PairingUpdate::LinkButtonWait { attempt }).await;
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = cancel.recv() => return Self::cancelled(),
                    }
                }
                Ok(RegistrationReply::Failed { code, description }) => {
                    warn!("hub refused registration: {} (type {})", description, code);
                    return PairingOutcome::Aborted {
                        reason: format!("bridge refused registration: {} (type {})", description, code),
                    };
                }
                Err(e) => {
                    warn!("malformed registration reply: {}", e);
                    return PairingOutcome::Aborted {
                        reason: format!(
                            "unexpected registration reply: {}",
                            String::from_utf8_lossy(&raw)
                        ),
                    };
                }
            }
        }
    }

    async fn emit(&self, update: PairingUpdate) {
        if let Some(tx) = &self.updates {
            let _ = tx.send(update).await;
        }
    }

    fn cancelled() -> PairingOutcome {
        info!("pairing cancelled");
        PairingOutcome::Aborted {
            reason: "pairing cancelled".to_string(),
        }
    }
}

/// POST body for a registration attempt
fn registration_body(config: &PairingConfig) -> serde_json::Value {
    let mut body = serde_json::json!({ "devicetype": config.devicetype });
    if let Some(credential) = &config.credential {
        body["username"] = serde_json::Value::String(credential.clone());
    }
    body
}
