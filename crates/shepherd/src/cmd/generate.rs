//! Generate command - append synthetic access-log lines to a file
//!
//! Produces NGINX-style access log entries for demos and end-to-end
//! testing, typically pointed at the same file an agent is tailing. The
//! status distribution is 80% success, 15% client error, 5% server error.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

/// Sample client IPs
const SAMPLE_IPS: &[&str] = &[
    "192.168.1.101",
    "10.0.0.55",
    "203.45.67.89",
    "172.16.0.99",
    "192.168.1.50",
    "10.10.10.1",
];

/// Sample request paths
const SAMPLE_PATHS: &[&str] = &[
    "/api/users",
    "/api/orders",
    "/dashboard",
    "/login",
    "/api/products",
    "/old-page",
    "/api/auth",
    "/static/app.js",
];

/// HTTP methods
const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];

/// Sample user agents
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
];

/// Generate command arguments
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// File to append generated lines to (created if missing)
    #[arg(long)]
    pub log_file: PathBuf,

    /// Minimum delay between lines
    #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
    pub min_interval: Duration,

    /// Maximum delay between lines
    #[arg(long, default_value = "8s", value_parser = humantime::parse_duration)]
    pub max_interval: Duration,

    /// Stop after this many lines (default: run until interrupted)
    #[arg(long)]
    pub count: Option<u64>,
}

/// Run the generate command
pub async fn run(args: GenerateArgs) -> Result<()> {
    if let Some(parent) = args.log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&args.log_file)
        .with_context(|| format!("failed to open {}", args.log_file.display()))?;

    info!(file = %args.log_file.display(), "generating sample logs");

    let mut written = 0u64;
    loop {
        if let Some(count) = args.count {
            if written >= count {
                break;
            }
        }

        // Scope the rng so the sleep below holds nothing non-Send
        let (line, delay) = {
            let mut rng = rand::thread_rng();
            let min = args.min_interval.as_secs_f64();
            let max = args.max_interval.as_secs_f64().max(min);
            (generate_line(&mut rng), rng.gen_range(min..=max))
        };

        file.write_all(line.text.as_bytes())?;
        file.flush()?;
        written += 1;

        info!(
            method = %line.method,
            path = %line.path,
            status = line.status,
            "generated log line"
        );

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs_f64(delay)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("log generation stopped");
                break;
            }
        }
    }

    Ok(())
}

/// One generated entry plus the fields worth logging
struct GeneratedLine {
    text: String,
    status: u16,
    method: &'static str,
    path: &'static str,
}

/// Build one access-log line
fn generate_line<R: Rng>(rng: &mut R) -> GeneratedLine {
    let ip = SAMPLE_IPS.choose(rng).copied().unwrap_or("127.0.0.1");
    let method = METHODS.choose(rng).copied().unwrap_or("GET");
    let path = SAMPLE_PATHS.choose(rng).copied().unwrap_or("/");
    let user_agent = USER_AGENTS.choose(rng).copied().unwrap_or("curl/8.0");

    // 80% success, 15% client errors, 5% server errors
    let roll: f64 = rng.gen_range(0.0..1.0);
    let status = if roll < 0.80 {
        *[200u16, 201, 204].choose(rng).unwrap_or(&200)
    } else if roll < 0.95 {
        *[400u16, 401, 403, 404].choose(rng).unwrap_or(&404)
    } else {
        *[500u16, 502, 503].choose(rng).unwrap_or(&500)
    };

    let size: u32 = rng.gen_range(100..=10_000);
    let response_time: f64 = rng.gen_range(0.1..5.0);
    let timestamp = chrono::Utc::now().format("%d/%b/%Y:%H:%M:%S +0000");

    let text = format!(
        "{ip} - - [{timestamp}] \"{method} {path} HTTP/1.1\" {status} {size} \"-\" \"{user_agent}\" {response_time:.3}\n"
    );

    GeneratedLine {
        text,
        status,
        method,
        path,
    }
}
