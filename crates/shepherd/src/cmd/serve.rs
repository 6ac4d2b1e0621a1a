//! Serve command - run the ingestion and API servers

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use shepherd_api::{ApiServer, ApiServerConfig};
use shepherd_config::Config;
use shepherd_sources::{IngestSource, IngestSourceConfig};
use shepherd_store::RecordStore;
use shepherd_tap::Broadcaster;

/// Serve command arguments
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to configuration file (defaults to shepherd.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    // Load configuration
    let config = match args.config {
        Some(path) => {
            // User explicitly provided a config path - it must exist
            if !path.exists() {
                return Err(anyhow::anyhow!(
                    "config file not found: {}",
                    path.display()
                ));
            }
            Config::from_file(&path).context("failed to load configuration")?
        }
        None => {
            // Try default paths, fall back to built-in defaults
            let default_paths = [
                PathBuf::from("shepherd.toml"),
                PathBuf::from("configs/shepherd.toml"),
            ];

            let mut loaded = None;
            for path in &default_paths {
                if path.exists() {
                    loaded =
                        Some(Config::from_file(path).context("failed to load configuration")?);
                    break;
                }
            }

            loaded.unwrap_or_default()
        }
    };

    crate::init_logging(config.log.level.as_str(), config.log.format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        ingest_port = config.ingest.port,
        api_port = config.api.port,
        "Shepherd starting"
    );

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("Shepherd shutdown complete");
    Ok(())
}

/// Main server run loop
async fn run_server(config: Config) -> Result<()> {
    // Coordinated shutdown for everything spawned below
    let cancel = CancellationToken::new();

    // The two shared pieces of state
    let store = Arc::new(RecordStore::with_capacity(config.buffer.capacity));
    let broadcaster = Arc::new(Broadcaster::with_limits(
        config.tap.max_subscribers,
        config.tap.channel_buffer,
    ));
    let _maintenance = broadcaster.spawn_maintenance();

    // Ingestion server (agent connections)
    let ingest_config = IngestSourceConfig {
        address: config.ingest.address.clone(),
        port: config.ingest.port,
        buffer_size: config.ingest.buffer_size,
        max_line_length: config.ingest.max_line_length,
        nodelay: config.ingest.nodelay,
        keepalive: config.ingest.keepalive,
        connection_timeout: config.ingest.connection_timeout,
        ..Default::default()
    };
    let ingest = Arc::new(IngestSource::new(
        ingest_config,
        Arc::clone(&store),
        Arc::clone(&broadcaster),
    ));

    let mut ingest_handle = {
        let ingest = Arc::clone(&ingest);
        let cancel = cancel.clone();
        tokio::spawn(async move { ingest.run(cancel).await })
    };

    // API server (queries and WebSocket subscribers)
    let api_config = ApiServerConfig {
        address: config.api.address.clone(),
        port: config.api.port,
        ping_interval: config.tap.ping_interval,
    };
    let api = ApiServer::new(api_config, Arc::clone(&store), Arc::clone(&broadcaster));

    let mut api_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { api.run(cancel).await })
    };

    // Run until ctrl-c or a server dies
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        result = &mut ingest_handle => {
            match result {
                Ok(Err(e)) => error!(error = %e, "ingest server exited"),
                Err(e) => error!(error = %e, "ingest server panicked"),
                Ok(Ok(())) => {}
            }
        }
        result = &mut api_handle => {
            match result {
                Ok(Err(e)) => error!(error = %e, "API server exited"),
                Err(e) => error!(error = %e, "API server panicked"),
                Ok(Ok(())) => {}
            }
        }
    }

    // Tear down everything else; no flush guarantee for in-flight records
    cancel.cancel();
    let drain = std::time::Duration::from_secs(2);
    if !ingest_handle.is_finished() {
        let _ = tokio::time::timeout(drain, ingest_handle).await;
    }
    if !api_handle.is_finished() {
        let _ = tokio::time::timeout(drain, api_handle).await;
    }

    Ok(())
}
