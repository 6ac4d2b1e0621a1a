//! Shepherd - log streaming service
//!
//! # Usage
//!
//! ```bash
//! # Run the server (default)
//! shepherd
//! shepherd serve --config shepherd.toml
//!
//! # Tail a log file and push new lines to a running server
//! shepherd agent --log-file /var/log/nginx/access.log
//!
//! # Append synthetic access-log lines for demos and testing
//! shepherd generate --log-file /tmp/demo.log
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shepherd_config::LogFormat;

/// Shepherd - log streaming service
#[derive(Parser, Debug)]
#[command(name = "shepherd")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (applies to serve when no subcommand given)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the ingestion and API servers
    Serve(cmd::serve::ServeArgs),

    /// Tail a log file and push new lines to a running server
    Agent(cmd::agent::AgentArgs),

    /// Append synthetic access-log lines to a file
    Generate(cmd::generate::GenerateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(args)) => cmd::serve::run(args).await,
        Some(Command::Agent(args)) => {
            init_logging("info", LogFormat::Console)?;
            cmd::agent::run(args).await
        }
        Some(Command::Generate(args)) => {
            init_logging("info", LogFormat::Console)?;
            cmd::generate::run(args).await
        }
        // No subcommand = run server (default behavior)
        None => {
            let args = cmd::serve::ServeArgs { config: cli.config };
            cmd::serve::run(args).await
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Console => {
            registry
                .with(fmt::layer().with_target(true).with_thread_ids(false))
                .init();
        }
        LogFormat::Json => {
            registry.with(fmt::layer().json()).init();
        }
    }

    Ok(())
}
