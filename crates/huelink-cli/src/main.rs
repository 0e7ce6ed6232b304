//! huelink CLI - pair with a lighting hub and drive a light from the
//! command line
//!
//! The binary stands in for the wearable: it injects the same commands the
//! device would send and renders the status reports that come back.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use huelink_core::{hub, to_device_scale, ConfigCache, DeviceMessage, MessageKey};
use huelink_pairing::{PairingConfig, PairingController, PairingOutcome, PairingUpdate};
use huelink_relay::CommandRelay;
use huelink_transport::{link, DeviceReceiver, HttpHub, HubTransport};

mod settings;

use settings::Settings;

/// huelink - wearable-to-lighting-hub command relay
#[derive(Parser)]
#[command(name = "huelink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register with a hub and store the issued credential
    Pair {
        /// Hub address (host or IP, scheme optional); defaults to the stored one
        address: Option<String>,

        /// Candidate credential to reuse or request
        #[arg(short = 'u', long)]
        credential: Option<String>,

        /// Seconds between link-button polls
        #[arg(long, default_value = "1")]
        poll_interval: u64,
    },

    /// Toggle the configured light
    Toggle,

    /// Set the light brightness (0-99)
    Brightness {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=99))]
        level: u8,
    },

    /// Show the light's current state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    let settings_path = cli
        .config
        .or_else(Settings::default_path)
        .context("no settings path; pass --config")?;
    let settings = Settings::load(&settings_path)?;

    match cli.command {
        Commands::Pair {
            address,
            credential,
            poll_interval,
        } => {
            run_pair(settings, &settings_path, address, credential, poll_interval).await?;
        }

        Commands::Toggle => {
            run_toggle(&settings).await?;
        }

        Commands::Brightness { level } => {
            run_brightness(&settings, level).await?;
        }

        Commands::Status => {
            run_status(&settings).await?;
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}

fn hub_client(settings: &Settings) -> Result<HttpHub> {
    HttpHub::new(Duration::from_secs(settings.request_timeout_secs))
        .context("failed to build the hub HTTP client")
}

async fn run_pair(
    mut settings: Settings,
    settings_path: &std::path::Path,
    address: Option<String>,
    credential: Option<String>,
    poll_interval: u64,
) -> Result<()> {
    let address = address
        .or_else(|| settings.address.clone())
        .context("no hub address; pass one or store it in the settings file")?;
    let candidate = credential.or_else(|| settings.credential.clone());

    println!(
        "{} Pairing with hub at {}",
        "huelink".cyan().bold(),
        address.yellow()
    );

    let mut config = PairingConfig::new(address.clone());
    config.credential = candidate;
    config.poll_interval = Duration::from_secs(poll_interval.max(1));

    let mut controller = PairingController::new(hub_client(&settings)?, config);
    let mut updates = controller.updates();

    // Ctrl+C cancels the run at its next await point
    let (cancel_tx, cancel_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl+c");
        info!("Received shutdown signal");
        let _ = cancel_tx.send(()).await;
    });

    let render = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            match update {
                PairingUpdate::CheckingAddress => {
                    println!("  checking bridge address...");
                }
                PairingUpdate::AddressOk => {
                    println!("  {} address answers like a bridge", "OK".green().bold());
                }
                PairingUpdate::CheckingCredential => {
                    println!("  checking stored credential...");
                }
                PairingUpdate::Registering => {
                    println!("  requesting a credential...");
                }
                PairingUpdate::LinkButtonWait { attempt } => {
                    println!(
                        "  {} press the link button on the bridge (attempt {})",
                        "...".yellow(),
                        attempt
                    );
                }
            }
        }
    });

    let outcome = controller.run(cancel_rx).await;
    render.abort();

    match outcome {
        PairingOutcome::Registered { username } => {
            println!(
                "{} Bridge issued credential {}",
                "OK".green().bold(),
                username.yellow()
            );
            settings.address = Some(address);
            settings.credential = Some(username);
            settings.save(settings_path)?;
            println!("  stored in {}", settings_path.display());
        }
        PairingOutcome::AlreadyRegistered { username } => {
            println!(
                "{} Credential {} is already registered, reusing it",
                "OK".green().bold(),
                username.yellow()
            );
            settings.address = Some(address);
            settings.credential = Some(username);
            settings.save(settings_path)?;
            println!("  stored in {}", settings_path.display());
        }
        PairingOutcome::Aborted { reason } => {
            println!("{} {}", "Pairing failed:".red().bold(), reason);
        }
    }

    Ok(())
}

/// Run one command through the relay, acting as the device side of the link
async fn relay_command(settings: &Settings, message: DeviceMessage) -> Result<Vec<DeviceMessage>> {
    let cache = Arc::new(ConfigCache::new(settings.bridge_config()));
    let (app, mut device) = link(8);
    let relay = CommandRelay::new(hub_client(settings)?, app.sender, cache);

    relay.on_device_message(message).await;

    // Everything the relay had to say is queued by now; drain it
    let mut reports = Vec::new();
    while let Ok(Some(report)) =
        tokio::time::timeout(Duration::from_millis(100), device.receiver.recv()).await
    {
        reports.push(report);
    }
    Ok(reports)
}

fn print_reports(reports: &[DeviceMessage]) {
    for report in reports {
        // Configuration requests echo the triggering command, so check
        // for them before reading the status keys
        if report.value_of(MessageKey::ConfigRequest).is_some() {
            println!(
                "{} Bridge configuration is incomplete; run {} first and set {} in the settings file",
                "Failed:".red().bold(),
                "huelink pair".yellow(),
                "light_id".yellow()
            );
            continue;
        }
        if let Some(state) = report
            .value_of(MessageKey::LightState)
            .and_then(|v| v.as_i64())
        {
            match state {
                1 => println!("{} Light is on", "OK".green().bold()),
                0 => println!("{} Light is off", "OK".green().bold()),
                _ => println!("{} The hub did not confirm the change", "Failed:".red().bold()),
            }
        }
        if let Some(level) = report
            .value_of(MessageKey::Brightness)
            .and_then(|v| v.as_i64())
        {
            println!("  brightness {}/99", level);
        }
    }
}

async fn run_toggle(settings: &Settings) -> Result<()> {
    println!("{} Toggling the light", "huelink".cyan().bold());
    let reports = relay_command(settings, DeviceMessage::single(MessageKey::LightState, 1)).await?;
    print_reports(&reports);
    Ok(())
}

async fn run_brightness(settings: &Settings, level: u8) -> Result<()> {
    println!(
        "{} Setting brightness to {}/99",
        "huelink".cyan().bold(),
        level
    );
    let reports = relay_command(
        settings,
        DeviceMessage::single(MessageKey::Brightness, level as i64),
    )
    .await?;
    if reports.is_empty() {
        // Brightness writes are not echoed; silence means the PUT went out
        println!("{} Brightness sent", "OK".green().bold());
    } else {
        print_reports(&reports);
    }
    Ok(())
}

async fn run_status(settings: &Settings) -> Result<()> {
    let cache = ConfigCache::new(settings.bridge_config());
    let Some(endpoint) = cache.endpoint() else {
        println!(
            "{} Bridge configuration is incomplete; run {} first and set {} in the settings file",
            "Failed:".red().bold(),
            "huelink pair".yellow(),
            "light_id".yellow()
        );
        return Ok(());
    };

    let client = hub_client(settings)?;
    let Some(body) = client.get(&endpoint.light_url()).await else {
        println!("{} The bridge did not answer", "Failed:".red().bold());
        return Ok(());
    };
    match hub::decode_light(&body) {
        Ok(snapshot) => {
            let state = if snapshot.state.on {
                "on".green().bold()
            } else {
                "off".yellow().bold()
            };
            print!("{} Light {} is {}", "OK".green().bold(), endpoint.light_id, state);
            match snapshot.state.bri {
                Some(bri) => println!(", brightness {}/99", to_device_scale(bri)),
                None => println!(),
            }
        }
        Err(e) => {
            println!("{} Unreadable reply from the bridge: {}", "Failed:".red().bold(), e);
        }
    }
    Ok(())
}
