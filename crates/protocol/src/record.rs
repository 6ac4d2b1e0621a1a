//! Record types
//!
//! A [`RawIngestMessage`] is what an agent puts on the wire: the raw log
//! line plus capture metadata. The ingestion server enriches it into a
//! [`LogRecord`] - parsed fields, a unique id, and acknowledgment state -
//! which is what the store retains and subscribers receive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Process-wide sequence for record id generation
static RECORD_SEQ: AtomicU64 = AtomicU64::new(1);

/// Message pushed by an agent, one JSON object per line
///
/// Immutable once received. Unknown fields are ignored so agents can evolve
/// independently of the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIngestMessage {
    /// Capture time (unix seconds)
    pub timestamp: f64,

    /// The raw log line, untouched
    pub raw_line: String,

    /// Originating source (file path, host name, ...)
    pub source: String,

    /// Optional free-form metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Structured fields extracted from an access-log line
///
/// Always fully populated - the parser substitutes defaults for anything it
/// cannot extract, so no field is ever missing downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFields {
    /// HTTP status code (500 when unparseable)
    pub status_code: u16,

    /// Client IP address ("unknown" when unparseable)
    pub client_ip: String,

    /// HTTP method ("UNKNOWN" when unparseable)
    pub method: String,

    /// Request path ("/" when unparseable)
    pub path: String,

    /// Response size in bytes (0 when unparseable)
    pub response_size: u64,

    /// User agent string ("unknown" when unparseable)
    pub user_agent: String,
}

impl Default for ParsedFields {
    fn default() -> Self {
        Self {
            status_code: 500,
            client_ip: "unknown".into(),
            method: "UNKNOWN".into(),
            path: "/".into(),
            response_size: 0,
            user_agent: "unknown".into(),
        }
    }
}

impl ParsedFields {
    /// Check if this represents an error response (4xx or 5xx)
    #[inline]
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

/// The unit stored and broadcast
///
/// Only `acknowledged`/`acknowledged_at` are ever mutated after creation,
/// and only by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unique record id (ingest millis + monotonic sequence)
    pub id: String,

    /// Capture time from the agent (unix seconds)
    pub timestamp: f64,

    /// The raw log line
    pub raw_line: String,

    /// Originating source
    pub source: String,

    /// Structured fields extracted from `raw_line`
    pub parsed: ParsedFields,

    /// Whether an operator has acknowledged this record
    pub acknowledged: bool,

    /// When the record was first acknowledged (unix seconds)
    pub acknowledged_at: Option<f64>,
}

impl LogRecord {
    /// Build a record from a decoded message and its parsed fields
    pub fn from_message(id: String, message: RawIngestMessage, parsed: ParsedFields) -> Self {
        Self {
            id,
            timestamp: message.timestamp,
            raw_line: message.raw_line,
            source: message.source,
            parsed,
            acknowledged: false,
            acknowledged_at: None,
        }
    }
}

/// Generate a unique record id for the given ingest time
///
/// Ids combine the wall-clock millisecond with a process-wide monotonic
/// sequence, so two records ingested within the same millisecond still get
/// distinct ids.
pub fn next_record_id(ingest_millis: u64) -> String {
    let seq = RECORD_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{ingest_millis}-{seq}")
}

/// Current wall-clock time as unix seconds
pub fn now_unix_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Current wall-clock time as unix milliseconds
pub fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
