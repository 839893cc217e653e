#![allow(missing_docs)]

//! Mattermost bridge binary.
//!
//! `start` establishes the session and streams generic events as JSON lines
//! on stdout -- the host automation engine reads them from there (or embeds
//! the library and consumes the channel directly). `check-config` validates
//! the configuration without connecting.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use mattermost_bridge::config::BridgeConfig;
use mattermost_bridge::logging;
use mattermost_bridge::mattermost::session::SessionBridge;

/// Buffer size for the host event channel.
const EVENT_CHANNEL_BUFFER: usize = 100;

#[derive(Parser)]
#[command(name = "mattermost-bridge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to the server and stream generic events to stdout.
    Start {
        /// Directory for rotated JSON log files.
        #[arg(long, default_value = "logs")]
        logs_dir: PathBuf,
    },
    /// Load and validate the configuration, then print a summary.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Start { logs_dir } => start(&logs_dir).await,
        Command::CheckConfig => check_config(),
    }
}

async fn start(logs_dir: &std::path::Path) -> Result<()> {
    let _guard = logging::init_production(logs_dir).context("failed to initialise logging")?;

    let config = BridgeConfig::load().context("failed to load configuration")?;
    config.validate()?;

    let bridge = SessionBridge::connect(&config)
        .await
        .context("could not establish Mattermost session")?;
    let session = bridge.session().clone();
    info!(
        username = %session.username,
        server_version = %session.server_version,
        "bridge connected"
    );

    let (event_tx, mut event_rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // Ctrl-C triggers a clean stop of the dispatch loop.
    let ctrlc_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = ctrlc_tx.send(());
        }
    });

    // Host stand-in: emit each generic event as one JSON line on stdout.
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "could not serialize event"),
            }
        }
    });

    let result = bridge.run(event_tx, shutdown_rx).await;
    printer.await.ok();

    if let Err(e) = result {
        error!(error = %e, "bridge stopped with an error");
        return Err(e.into());
    }
    info!("bridge stopped");
    Ok(())
}

fn check_config() -> Result<()> {
    logging::init_cli();

    let config = BridgeConfig::load().context("failed to load configuration")?;
    config.validate()?;

    println!("configuration OK");
    println!("  api_url:   {}", config.api_url);
    println!("  ws_url:    {}", config.ws_url);
    println!("  name:      {}", config.source_name());
    println!("  auth:      token set ({} chars)", config.auth_token.len());
    if !config.team_name.is_empty() {
        println!("  team_name: {} (declared, not acted on)", config.team_name);
    }
    if !config.channels.is_empty() {
        println!(
            "  channels:  {} configured (declared, not acted on)",
            config.channels.len()
        );
    }
    Ok(())
}
