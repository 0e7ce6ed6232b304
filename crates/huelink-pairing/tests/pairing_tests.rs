//! Pairing Controller Integration Tests
//!
//! Runs the handshake against a scripted hub:
//! - Address and credential probes in order
//! - The link-button long-poll: N refusals then success means N+1 POSTs
//! - Terminal aborts on hub refusals and dead transports
//! - Cancellation during the long-poll

use std::time::Duration;
use tokio::sync::mpsc;

use huelink_pairing::{PairingConfig, PairingController, PairingOutcome, PairingUpdate};
use huelink_test_utils::{
    bridge_state_body, hub_error_body, link_button_body, registration_success_body, Method,
    ScriptedHub,
};

const API_URL: &str = "http://bridge/api/";
const USER_URL: &str = "http://bridge/api/existing/";

fn fast_config(address: &str) -> PairingConfig {
    let mut config = PairingConfig::new(address);
    config.poll_interval = Duration::from_millis(1);
    config
}

/// The hub's answer to an anonymous `GET /api/` - an error array, but a
/// live bridge behind it
fn probe_ok() -> bytes::Bytes {
    hub_error_body(4, "method, GET, not available for resource, /")
}

fn cancel_channel() -> (mpsc::Sender<()>, mpsc::Receiver<()>) {
    mpsc::channel(1)
}

#[tokio::test]
async fn test_registration_after_n_link_button_refusals() {
    let hub = ScriptedHub::new();
    hub.script(Method::Get, API_URL, probe_ok());
    hub.script(Method::Post, API_URL, link_button_body());
    hub.script(Method::Post, API_URL, link_button_body());
    hub.script(Method::Post, API_URL, registration_success_body("issued-user"));

    let controller = PairingController::new(hub.clone(), fast_config("bridge"));
    let (_cancel_tx, cancel_rx) = cancel_channel();
    let outcome = controller.run(cancel_rx).await;

    assert_eq!(
        outcome,
        PairingOutcome::Registered {
            username: "issued-user".to_string()
        }
    );
    // Two refusals then success: exactly three POSTs
    assert_eq!(hub.request_count(Method::Post, API_URL), 3);
}

#[tokio::test]
async fn test_immediate_registration() {
    let hub = ScriptedHub::new();
    hub.script(Method::Get, API_URL, probe_ok());
    hub.script(Method::Post, API_URL, registration_success_body("issued-user"));

    let controller = PairingController::new(hub.clone(), fast_config("bridge"));
    let (_cancel_tx, cancel_rx) = cancel_channel();
    let outcome = controller.run(cancel_rx).await;

    assert_eq!(
        outcome,
        PairingOutcome::Registered {
            username: "issued-user".to_string()
        }
    );
    assert_eq!(hub.request_count(Method::Post, API_URL), 1);

    let post = hub
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    assert_eq!(post.body, Some(serde_json::json!({ "devicetype": "huelink" })));
}

#[tokio::test]
async fn test_generic_hub_error_aborts_after_one_post() {
    let hub = ScriptedHub::new();
    hub.script(Method::Get, API_URL, probe_ok());
    hub.script(Method::Post, API_URL, hub_error_body(1, "unauthorized user"));

    let controller = PairingController::new(hub.clone(), fast_config("bridge"));
    let (_cancel_tx, cancel_rx) = cancel_channel();
    let outcome = controller.run(cancel_rx).await;

    match outcome {
        PairingOutcome::Aborted { reason } => {
            assert!(reason.contains("unauthorized user"), "reason: {}", reason);
        }
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(hub.request_count(Method::Post, API_URL), 1);
}

#[tokio::test]
async fn test_registered_credential_is_reused_without_a_post() {
    let hub = ScriptedHub::new();
    hub.script(Method::Get, API_URL, probe_ok());
    hub.script(Method::Get, USER_URL, bridge_state_body());

    let mut config = fast_config("bridge");
    config.credential = Some("existing".to_string());
    let controller = PairingController::new(hub.clone(), config);
    let (_cancel_tx, cancel_rx) = cancel_channel();
    let outcome = controller.run(cancel_rx).await;

    assert_eq!(
        outcome,
        PairingOutcome::AlreadyRegistered {
            username: "existing".to_string()
        }
    );
    assert_eq!(hub.request_count(Method::Post, API_URL), 0);
}

#[tokio::test]
async fn test_unregistered_credential_is_requested_by_name() {
    let hub = ScriptedHub::new();
    hub.script(Method::Get, API_URL, probe_ok());
    hub.script(Method::Get, USER_URL, hub_error_body(1, "unauthorized user"));
    hub.script(Method::Post, API_URL, registration_success_body("existing"));

    let mut config = fast_config("bridge");
    config.credential = Some("existing".to_string());
    let controller = PairingController::new(hub.clone(), config);
    let (_cancel_tx, cancel_rx) = cancel_channel();
    let outcome = controller.run(cancel_rx).await;

    assert_eq!(
        outcome,
        PairingOutcome::Registered {
            username: "existing".to_string()
        }
    );
    // The candidate credential rides along in the registration body
    let post = hub
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    assert_eq!(
        post.body,
        Some(serde_json::json!({ "devicetype": "huelink", "username": "existing" }))
    );
}

#[tokio::test]
async fn test_unreachable_address_aborts() {
    let hub = ScriptedHub::new();
    // Nothing scripted: the probe resolves like a dead address

    let controller = PairingController::new(hub.clone(), fast_config("bridge"));
    let (_cancel_tx, cancel_rx) = cancel_channel();
    let outcome = controller.run(cancel_rx).await;

    assert_eq!(
        outcome,
        PairingOutcome::Aborted {
            reason: "address is not a valid bridge".to_string()
        }
    );
    assert_eq!(hub.request_count(Method::Post, API_URL), 0);
}

#[tokio::test]
async fn test_transport_failure_during_registration_aborts() {
    let hub = ScriptedHub::new();
    hub.script(Method::Get, API_URL, probe_ok());
    hub.script_failure(Method::Post, API_URL);

    let controller = PairingController::new(hub.clone(), fast_config("bridge"));
    let (_cancel_tx, cancel_rx) = cancel_channel();
    let outcome = controller.run(cancel_rx).await;

    match outcome {
        PairingOutcome::Aborted { reason } => {
            assert!(reason.contains("did not answer"), "reason: {}", reason);
        }
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(hub.request_count(Method::Post, API_URL), 1);
}

#[tokio::test]
async fn test_cancellation_stops_the_link_button_poll() {
    let hub = ScriptedHub::new();
    hub.script(Method::Get, API_URL, probe_ok());
    for _ in 0..10 {
        hub.script(Method::Post, API_URL, link_button_body());
    }

    // A long interval keeps the run inside the sleep when cancel arrives
    let mut config = fast_config("bridge");
    config.poll_interval = Duration::from_secs(30);

    let mut controller = PairingController::new(hub.clone(), config);
    let mut updates = controller.updates();
    let (cancel_tx, cancel_rx) = cancel_channel();

    let run = tokio::spawn(controller.run(cancel_rx));

    // Wait until the controller reports it is polling the link button
    loop {
        match updates.recv().await.expect("run ended before polling") {
            PairingUpdate::LinkButtonWait { .. } => break,
            _ => continue,
        }
    }
    cancel_tx.send(()).await.unwrap();

    let outcome = run.await.unwrap();
    match outcome {
        PairingOutcome::Aborted { reason } => {
            assert!(reason.contains("cancelled"), "reason: {}", reason);
        }
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(hub.request_count(Method::Post, API_URL), 1);
}

#[tokio::test]
async fn test_progress_updates_arrive_in_phase_order() {
    let hub = ScriptedHub::new();
    hub.script(Method::Get, API_URL, probe_ok());
    hub.script(Method::Get, USER_URL, hub_error_body(1, "unauthorized user"));
    hub.script(Method::Post, API_URL, link_button_body());
    hub.script(Method::Post, API_URL, registration_success_body("issued-user"));

    let mut config = fast_config("bridge");
    config.credential = Some("existing".to_string());
    let mut controller = PairingController::new(hub.clone(), config);
    let mut updates = controller.updates();
    let (_cancel_tx, cancel_rx) = cancel_channel();

    let run = tokio::spawn(controller.run(cancel_rx));
    let mut seen = Vec::new();
    while let Some(update) = updates.recv().await {
        seen.push(update);
    }
    run.await.unwrap();

    assert_eq!(
        seen,
        vec![
            PairingUpdate::CheckingAddress,
            PairingUpdate::AddressOk,
            PairingUpdate::CheckingCredential,
            PairingUpdate::Registering,
            PairingUpdate::LinkButtonWait { attempt: 1 },
        ]
    );
}
