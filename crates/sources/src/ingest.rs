//! Ingest TCP Source
//!
//! Receives log data pushed by agents over persistent TCP connections.
//!
//! # Framing
//!
//! Newline-delimited UTF-8 text. Each line is one JSON-encoded
//! `RawIngestMessage`. Lines exceeding the configured maximum are consumed
//! and dropped; a partial line at EOF is discarded.
//!
//! # Per-line pipeline
//!
//! decode JSON → parse `raw_line` into structured fields → assign record id
//! → append to the store → publish to the broadcaster. A decode failure
//! skips the line and keeps the connection open; parse failures cannot
//! happen (the parser is total).
//!
//! # Design
//!
//! - **Per-connection tasks**: each connection runs independently; no
//!   cross-connection ordering is guaranteed beyond what the store's lock
//!   serializes
//! - **Bounded line reads**: prevents memory exhaustion from unframed input
//! - **Never fail outward**: the only things that end a connection are peer
//!   disconnect, transport errors, idle timeout, and shutdown

use std::io;
use std::net::SocketAddr;
#[cfg(unix)]
use std::os::fd::{AsRawFd, FromRawFd};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[cfg(unix)]
use socket2::{Socket, TcpKeepalive};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use shepherd_protocol::{
    decode_line, next_record_id, now_unix_millis, parse_access_log, LogRecord, ProtocolError,
};
use shepherd_store::RecordStore;
use shepherd_tap::Broadcaster;

use crate::common::SourceMetrics;

// =============================================================================
// Constants
// =============================================================================

/// Default ingest port
const DEFAULT_PORT: u16 = 9999;

/// Default maximum line length (64KB)
const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Default read buffer size (256KB)
const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Default socket buffer size (256KB)
const DEFAULT_SOCKET_BUFFER_SIZE: usize = 256 * 1024;

/// Default keepalive probe delay (60s idle)
const DEFAULT_KEEPALIVE_TIME: Duration = Duration::from_secs(60);

// =============================================================================
// Configuration
// =============================================================================

/// Ingest source configuration
#[derive(Debug, Clone)]
pub struct IngestSourceConfig {
    /// Source identifier (used in logs)
    pub id: String,

    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Read buffer size per connection
    pub buffer_size: usize,

    /// Maximum line length; longer lines are dropped
    pub max_line_length: usize,

    /// TCP nodelay (disable Nagle's algorithm)
    pub nodelay: bool,

    /// TCP keepalive enabled
    pub keepalive: bool,

    /// Socket buffer size for SO_RCVBUF/SO_SNDBUF
    pub socket_buffer_size: usize,

    /// Idle connection timeout (0 = no timeout)
    pub connection_timeout: Duration,
}

impl Default for IngestSourceConfig {
    fn default() -> Self {
        Self {
            id: "ingest".into(),
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            nodelay: true,
            keepalive: true,
            socket_buffer_size: DEFAULT_SOCKET_BUFFER_SIZE,
            connection_timeout: Duration::ZERO,
        }
    }
}

impl IngestSourceConfig {
    /// Create config with custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Ingest source metrics
#[derive(Debug, Default)]
pub struct IngestSourceMetrics {
    /// Base source metrics
    pub base: SourceMetrics,

    /// Lines read from connections
    pub lines_read: AtomicU64,

    /// Lines that failed JSON decoding
    pub lines_malformed: AtomicU64,

    /// Lines dropped for exceeding the length limit
    pub lines_oversized: AtomicU64,
}

impl IngestSourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            base: SourceMetrics::new(),
            lines_read: AtomicU64::new(0),
            lines_malformed: AtomicU64::new(0),
            lines_oversized: AtomicU64::new(0),
        }
    }

    /// Record a line read
    #[inline]
    pub fn line_read(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a line that failed decoding
    #[inline]
    pub fn line_malformed(&self) {
        self.lines_malformed.fetch_add(1, Ordering::Relaxed);
        self.base.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a line dropped for length
    #[inline]
    pub fn line_oversized(&self) {
        self.lines_oversized.fetch_add(1, Ordering::Relaxed);
        self.base.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get extended metrics snapshot
    pub fn snapshot(&self) -> IngestMetricsSnapshot {
        let base = self.base.snapshot();
        IngestMetricsSnapshot {
            connections_active: base.connections_active,
            connections_total: base.connections_total,
            messages_received: base.messages_received,
            bytes_received: base.bytes_received,
            records_stored: base.records_stored,
            errors: base.errors,
            lines_read: self.lines_read.load(Ordering::Relaxed),
            lines_malformed: self.lines_malformed.load(Ordering::Relaxed),
            lines_oversized: self.lines_oversized.load(Ordering::Relaxed),
        }
    }
}

/// Extended metrics snapshot for the ingest source
#[derive(Debug, Clone, Copy)]
pub struct IngestMetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
    pub records_stored: u64,
    pub errors: u64,
    pub lines_read: u64,
    pub lines_malformed: u64,
    pub lines_oversized: u64,
}

// =============================================================================
// Errors
// =============================================================================

/// Ingest source errors
#[derive(Debug, thiserror::Error)]
pub enum IngestSourceError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Source Implementation
// =============================================================================

/// TCP ingestion server
///
/// Accepts agent connections and feeds decoded records into the store and
/// the broadcaster.
pub struct IngestSource {
    /// Configuration
    config: IngestSourceConfig,

    /// Shared record store
    store: Arc<RecordStore>,

    /// Fan-out point for live subscribers
    broadcaster: Arc<Broadcaster>,

    /// Metrics
    metrics: Arc<IngestSourceMetrics>,

    /// Running flag
    running: Arc<AtomicBool>,
}

impl IngestSource {
    /// Create a new ingest source
    pub fn new(
        config: IngestSourceConfig,
        store: Arc<RecordStore>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            config,
            store,
            broadcaster,
            metrics: Arc::new(IngestSourceMetrics::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get metrics reference
    pub fn metrics(&self) -> &Arc<IngestSourceMetrics> {
        &self.metrics
    }

    /// Check if source is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the source
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Run the source (main entry point)
    ///
    /// Binds the listener and accepts connections until cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), IngestSourceError> {
        let bind_addr = self.config.bind_address();

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| IngestSourceError::Bind {
                address: bind_addr.clone(),
                source: e,
            })?;

        self.running.store(true, Ordering::Relaxed);

        tracing::info!(
            source_id = %self.config.id,
            address = %bind_addr,
            max_line_length = self.config.max_line_length,
            "ingest source listening"
        );

        self.accept_loop(listener, cancel).await
    }

    /// Accept loop - handles incoming connections
    async fn accept_loop(
        &self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), IngestSourceError> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.running.store(false, Ordering::Relaxed);
                    break;
                }
                accept_result = listener.accept() => {
                    if !self.running.load(Ordering::Relaxed) {
                        break;
                    }
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            self.metrics.base.connection_opened();
                            self.configure_socket(&stream);

                            let handler = ConnectionHandler {
                                config: self.config.clone(),
                                store: Arc::clone(&self.store),
                                broadcaster: Arc::clone(&self.broadcaster),
                                metrics: Arc::clone(&self.metrics),
                                running: Arc::clone(&self.running),
                                peer_addr,
                            };

                            tokio::spawn(async move {
                                let peer = handler.peer_addr;
                                tracing::debug!(peer = %peer, "agent connected");
                                if let Err(e) = handler.handle(stream).await {
                                    tracing::debug!(
                                        peer = %peer,
                                        error = %e,
                                        "ingest connection error"
                                    );
                                }
                                tracing::debug!(peer = %peer, "agent disconnected");
                            });
                        }
                        Err(e) => {
                            if self.running.load(Ordering::Relaxed) {
                                tracing::warn!(error = %e, "ingest accept error");
                                self.metrics.base.error();
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(source_id = %self.config.id, "ingest source stopped");

        Ok(())
    }

    /// Configure socket options using socket2 (Unix only)
    #[cfg(unix)]
    fn configure_socket(&self, stream: &TcpStream) {
        let fd = stream.as_raw_fd();

        // SAFETY: borrowing the fd temporarily; forget() below prevents
        // socket2 from closing it - tokio still owns the fd.
        let socket = unsafe { Socket::from_raw_fd(fd) };

        if self.config.nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(error = %e, "failed to set TCP_NODELAY");
            }
        }

        if self.config.socket_buffer_size > 0 {
            if let Err(e) = socket.set_recv_buffer_size(self.config.socket_buffer_size) {
                tracing::debug!(error = %e, "failed to set SO_RCVBUF");
            }
            if let Err(e) = socket.set_send_buffer_size(self.config.socket_buffer_size) {
                tracing::debug!(error = %e, "failed to set SO_SNDBUF");
            }
        }

        if self.config.keepalive {
            let keepalive = TcpKeepalive::new()
                .with_time(DEFAULT_KEEPALIVE_TIME)
                .with_interval(Duration::from_secs(10));
            if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
                tracing::debug!(error = %e, "failed to set TCP keepalive");
            }
        }

        // Don't close the fd - tokio owns it
        std::mem::forget(socket);
    }

    /// Configure socket - no-op on Windows (tokio handles defaults)
    #[cfg(not(unix))]
    fn configure_socket(&self, _stream: &TcpStream) {}
}

// =============================================================================
// Connection Handler
// =============================================================================

/// Handles a single agent connection
struct ConnectionHandler {
    config: IngestSourceConfig,
    store: Arc<RecordStore>,
    broadcaster: Arc<Broadcaster>,
    metrics: Arc<IngestSourceMetrics>,
    running: Arc<AtomicBool>,
    peer_addr: SocketAddr,
}

impl ConnectionHandler {
    /// Read loop for one connection
    async fn handle(self, stream: TcpStream) -> Result<(), IngestSourceError> {
        let mut reader = BufReader::with_capacity(self.config.buffer_size, stream);

        // Line buffer reused across reads, bounded to max_line_length
        let mut line_buf = Vec::with_capacity(self.config.max_line_length.min(4096));

        let timeout = if self.config.connection_timeout.is_zero() {
            None
        } else {
            Some(self.config.connection_timeout)
        };

        loop {
            if !self.running.load(Ordering::Relaxed) {
                break;
            }

            let read_result = match timeout {
                Some(limit) => {
                    match tokio::time::timeout(
                        limit,
                        read_bounded_line(&mut reader, &mut line_buf, self.config.max_line_length),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => {
                            tracing::debug!(peer = %self.peer_addr, "ingest connection timeout");
                            break;
                        }
                    }
                }
                None => {
                    read_bounded_line(&mut reader, &mut line_buf, self.config.max_line_length).await
                }
            };

            match read_result {
                Ok(ReadLineResult::Line(bytes_read)) => {
                    self.metrics.line_read();
                    self.process_line(&line_buf, bytes_read);
                    line_buf.clear();
                }
                Ok(ReadLineResult::TooLong) => {
                    self.metrics.line_oversized();
                    tracing::debug!(
                        peer = %self.peer_addr,
                        max = self.config.max_line_length,
                        "line too long, dropped"
                    );
                    line_buf.clear();
                }
                Ok(ReadLineResult::TrailingFragment) => {
                    // Unterminated final line - discarded, not buffered
                    // across reconnects
                    tracing::debug!(
                        peer = %self.peer_addr,
                        bytes = line_buf.len(),
                        "discarding partial line at EOF"
                    );
                    break;
                }
                Ok(ReadLineResult::Eof) => break,
                Err(e) => {
                    if !is_connection_reset(&e) {
                        self.metrics.base.error();
                        tracing::debug!(
                            peer = %self.peer_addr,
                            error = %e,
                            "ingest read error"
                        );
                    }
                    break;
                }
            }
        }

        self.metrics.base.connection_closed();

        Ok(())
    }

    /// Run one complete line through the decode → parse → store → broadcast
    /// pipeline
    ///
    /// Intentionally not async: nothing here blocks, and keeping it sync
    /// keeps the read loop simple.
    fn process_line(&self, line: &[u8], bytes_read: usize) {
        // Trim trailing newline (LF or CRLF)
        let mut line_len = line.len();
        if line_len > 0 && line[line_len - 1] == b'\n' {
            line_len -= 1;
        }
        if line_len > 0 && line[line_len - 1] == b'\r' {
            line_len -= 1;
        }
        let line = &line[..line_len];

        let message = match decode_line(line) {
            Ok(message) => message,
            Err(ProtocolError::EmptyLine) => return,
            Err(e) => {
                // Malformed lines are skipped, not fatal
                self.metrics.line_malformed();
                tracing::debug!(peer = %self.peer_addr, error = %e, "skipping malformed line");
                return;
            }
        };

        self.metrics.base.message_received(bytes_read as u64);

        let parsed = parse_access_log(&message.raw_line);
        let id = next_record_id(now_unix_millis());
        let record = LogRecord::from_message(id, message, parsed);

        tracing::trace!(
            id = %record.id,
            status = record.parsed.status_code,
            method = %record.parsed.method,
            path = %record.parsed.path,
            "ingested record"
        );

        self.store.append(record.clone());
        self.metrics.base.record_stored();

        self.broadcaster.publish(Arc::new(record));
    }
}

// =============================================================================
// Bounded Line Reading
// =============================================================================

/// Result of reading a bounded line
enum ReadLineResult {
    /// A newline-terminated line (with byte count including the newline)
    Line(usize),
    /// Line exceeded max size and was consumed/discarded
    TooLong,
    /// EOF with unterminated bytes pending - the fragment is discarded
    TrailingFragment,
    /// Clean end of stream
    Eof,
}

/// Read a line with bounded memory allocation
///
/// Reads until newline or `max_size` bytes. If the limit is hit the rest of
/// the line is consumed and discarded so framing stays intact. Only
/// newline-terminated data counts as a line; bytes left at EOF are reported
/// as a trailing fragment.
async fn read_bounded_line<R: AsyncBufReadExt + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_size: usize,
) -> io::Result<ReadLineResult> {
    buf.clear();

    let mut total_bytes = 0;
    let mut exceeded_limit = false;

    loop {
        let available = reader.fill_buf().await?;

        if available.is_empty() {
            // EOF
            if total_bytes == 0 {
                return Ok(ReadLineResult::Eof);
            }
            return Ok(ReadLineResult::TrailingFragment);
        }

        let newline_pos = available.iter().position(|&b| b == b'\n');
        let (bytes_to_consume, done) = match newline_pos {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };

        if !exceeded_limit {
            let space_remaining = max_size.saturating_sub(buf.len());
            if bytes_to_consume <= space_remaining {
                buf.extend_from_slice(&available[..bytes_to_consume]);
            } else {
                exceeded_limit = true;
            }
        }

        total_bytes += bytes_to_consume;
        reader.consume(bytes_to_consume);

        if done {
            break;
        }
    }

    if exceeded_limit {
        return Ok(ReadLineResult::TooLong);
    }

    Ok(ReadLineResult::Line(total_bytes))
}

/// Check if error is a connection reset (expected during teardown)
fn is_connection_reset(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod ingest_test;
