//! Agent command - tail a log file and push new lines to the server
//!
//! The agent polls the watched file for growth, wraps each appended line in
//! a wire-format ingest message, and writes it to the server connection.
//! It starts from the current end of the file (history is not replayed),
//! reconnects with a fixed backoff on failure, and makes no attempt to
//! resend lines lost while disconnected - the server tolerates
//! reconnect-induced gaps.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use shepherd_protocol::{now_unix_secs, RawIngestMessage};

/// Agent command arguments
#[derive(Args, Debug)]
pub struct AgentArgs {
    /// Path to the log file to monitor
    #[arg(long)]
    pub log_file: PathBuf,

    /// Server host
    #[arg(long, default_value = "localhost")]
    pub server_host: String,

    /// Server ingest port
    #[arg(long, default_value_t = 9999)]
    pub server_port: u16,

    /// Source label attached to every message (defaults to the file path)
    #[arg(long)]
    pub source: Option<String>,

    /// How often to check the file for new lines
    #[arg(long, default_value = "500ms", value_parser = humantime::parse_duration)]
    pub poll_interval: Duration,

    /// Delay before reconnecting after a connection failure
    #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
    pub reconnect_backoff: Duration,
}

/// Run the agent command
pub async fn run(args: AgentArgs) -> Result<()> {
    if !args.log_file.exists() {
        return Err(anyhow::anyhow!(
            "log file does not exist: {}",
            args.log_file.display()
        ));
    }

    let source = args
        .source
        .clone()
        .unwrap_or_else(|| args.log_file.display().to_string());

    let mut tailer = LogTailer::new(&args.log_file);

    info!(
        file = %args.log_file.display(),
        server = %format!("{}:{}", args.server_host, args.server_port),
        "monitoring log file"
    );

    let server_addr = format!("{}:{}", args.server_host, args.server_port);
    let mut connection: Option<TcpStream> = None;
    let mut poll = tokio::time::interval(args.poll_interval);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = poll.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("stopping log monitoring");
                break;
            }
        }

        let lines = match tailer.read_new_lines() {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "error reading log file");
                continue;
            }
        };

        for line in lines {
            let message = RawIngestMessage {
                timestamp: now_unix_secs(),
                raw_line: line,
                source: source.clone(),
                metadata: None,
            };

            if !send_message(&mut connection, &server_addr, &message, args.reconnect_backoff)
                .await
            {
                // Line is lost; remaining lines from this poll go the same
                // way once the next connect succeeds
                debug!("dropped line while disconnected");
            }
        }
    }

    Ok(())
}

/// Send one message, connecting on demand
///
/// On write failure the connection is dropped and the message is not
/// retried; the next call reconnects.
async fn send_message(
    connection: &mut Option<TcpStream>,
    server_addr: &str,
    message: &RawIngestMessage,
    backoff: Duration,
) -> bool {
    if connection.is_none() {
        match TcpStream::connect(server_addr).await {
            Ok(stream) => {
                info!(server = %server_addr, "connected to server");
                *connection = Some(stream);
            }
            Err(e) => {
                warn!(server = %server_addr, error = %e, "failed to connect to server");
                tokio::time::sleep(backoff).await;
                return false;
            }
        }
    }

    let mut wire = match serde_json::to_vec(message) {
        Ok(wire) => wire,
        Err(e) => {
            warn!(error = %e, "failed to encode message");
            return false;
        }
    };
    wire.push(b'\n');

    if let Some(stream) = connection {
        if let Err(e) = stream.write_all(&wire).await {
            warn!(error = %e, "failed to send log line");
            *connection = None;
            return false;
        }
        return true;
    }

    false
}

/// Tracks a position in a growing log file
///
/// Starts at the current end of the file; only complete (newline-terminated)
/// lines are returned, so a line mid-write is picked up whole on a later
/// poll. A truncated file (rotation) resets the position to the start.
pub struct LogTailer {
    path: PathBuf,
    offset: u64,
}

impl LogTailer {
    /// Create a tailer positioned at the current end of the file
    pub fn new(path: &Path) -> Self {
        let offset = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Self {
            path: path.to_path_buf(),
            offset,
        }
    }

    /// Read any complete lines appended since the last call
    pub fn read_new_lines(&mut self) -> std::io::Result<Vec<String>> {
        let mut file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            // File vanished (rotation in progress) - try again next poll
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let len = file.metadata()?.len();
        if len < self.offset {
            // Truncated - start over from the beginning
            debug!(file = %self.path.display(), "log file truncated, resetting position");
            self.offset = 0;
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        // Only consume up to the last complete line; a trailing fragment
        // stays in the file for the next poll
        let consumed = match buf.iter().rposition(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None => return Ok(Vec::new()),
        };
        self.offset += consumed as u64;

        let lines = buf[..consumed]
            .split(|&b| b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                String::from_utf8_lossy(line).into_owned()
            })
            .filter(|line| !line.trim().is_empty())
            .collect();

        Ok(lines)
    }

    /// Current read position
    pub fn offset(&self) -> u64 {
        self.offset
    }
}
