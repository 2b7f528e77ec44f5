//! Cell Monitor
//!
//! Notebook activity telemetry pipeline:
//! - Host signals read as JSON lines on stdin
//! - Debounced execution capture and help-session heartbeats
//! - Deduplicated, load-distributed delivery with retry

use std::sync::Arc;

use anyhow::{Context, Result};
use capture::{HostSignal, Pipeline};
use monitor_core::{LogNotifier, Settings};
use telemetry::init_tracing_from_env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Cell Monitor v{}", env!("CARGO_PKG_VERSION"));

    let settings = load_config()?;
    let pipeline = Pipeline::with_http(settings, Arc::new(LogNotifier))
        .context("Failed to build delivery pipeline")?;

    tokio::select! {
        result = read_signals(&pipeline) => {
            result.context("Failed to read host signals")?;
            info!("Host closed signal stream");
        }
        _ = shutdown_signal() => {}
    }

    info!("Shutting down...");
    pipeline.shutdown().await;

    info!("Shutdown complete");
    Ok(())
}

/// Feeds stdin JSON lines to the pipeline until EOF.
async fn read_signals(pipeline: &Pipeline) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<HostSignal>(line) {
            Ok(signal) => pipeline.handle(signal),
            Err(e) => warn!(error = %e, "Skipping unreadable host signal"),
        }
    }

    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Settings> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Settings::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("CELL_MONITOR")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut settings: Settings = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides for the fields hosts most often inject
    if let Ok(url) = std::env::var("CELL_MONITOR_SERVER_URL") {
        settings.server_url = url;
    }
    if let Ok(email) = std::env::var("CELL_MONITOR_EMAIL_ADDRESS") {
        settings.email_address = email;
    }
    if let Ok(user) = std::env::var("CELL_MONITOR_USER_NAME") {
        settings.user_name = user;
    }
    if let Ok(team) = std::env::var("CELL_MONITOR_TEAM_NAME") {
        settings.team_name = team;
    }

    Ok(settings)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
