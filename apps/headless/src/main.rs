//! CueLab Headless - standalone session runner for CueLab.
//!
//! Boots the playback-orchestration core without a GUI: binds the OSC
//! transport, validates the trial-order source, reports the participant's
//! presentation order, and keeps the connectivity monitor running until
//! shutdown. Useful for pre-session device checks and for driving a study
//! from scripts.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cuelab_core::{bootstrap_session, LoggingEventEmitter, TokioSpawner};
use tokio::signal;

use crate::config::RunnerConfig;

/// CueLab Headless - GUI-less playback orchestration runner.
#[derive(Parser, Debug)]
#[command(name = "cuelab-headless")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "CUELAB_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Participant number (1-based) for trial-order assignment.
    #[arg(short = 'n', long, default_value_t = 1, env = "CUELAB_PARTICIPANT")]
    participant: u32,

    /// Size of the randomized page group to report an order for.
    #[arg(short = 'g', long, env = "CUELAB_GROUP_SIZE")]
    group_size: Option<usize>,

    /// Receive port (overrides config file).
    #[arg(short = 'p', long, env = "CUELAB_RECEIVE_PORT")]
    receive_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("CueLab Headless v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        RunnerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.receive_port {
        config.receive_port = port;
    }

    log::info!(
        "Configuration: audio={}, receive_port={}, randomization={:?}",
        config.audio_peer,
        config.receive_port,
        config.randomization
    );

    // Bootstrap the session services; order files are validated here,
    // before anything else happens.
    let core_config = config.to_core_config();
    let spawner = Arc::new(TokioSpawner::current());
    let services = bootstrap_session(&core_config, spawner, Arc::new(LoggingEventEmitter))
        .context("Failed to bootstrap session services")?;

    log::info!(
        "Session services up, listening on port {}",
        services.receive_port()
    );

    // Report the participant's presentation order when a group size is known
    if let Some(group_size) = args.group_size {
        match services.orders.order_for(group_size, args.participant) {
            Some(order) => log::info!(
                "Participant {} presentation order: {:?}",
                args.participant,
                order
            ),
            None => log::info!(
                "Participant {}: authored page order applies",
                args.participant
            ),
        }
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    services.status.questionnaire_finished();
    services.shutdown();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
