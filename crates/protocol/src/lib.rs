//! Shepherd Protocol - data model and wire decoding
//!
//! This crate defines the types that flow through the Shepherd pipeline and
//! the two pure transformation steps applied to every ingested line:
//!
//! - **Wire decode**: one newline-delimited JSON object per log line, decoded
//!   into a [`RawIngestMessage`]. A malformed line is a recoverable error the
//!   caller skips; it never terminates a connection.
//! - **Line parsing**: [`parse_access_log`] turns raw access-log text into
//!   [`ParsedFields`]. Parsing is total - malformed input produces the
//!   default record, never an error.
//!
//! No I/O happens here; sources own the network side.

mod decode;
mod error;
mod parser;
mod record;

pub use decode::decode_line;
pub use error::{ProtocolError, Result};
pub use parser::parse_access_log;
pub use record::{
    next_record_id, now_unix_millis, now_unix_secs, LogRecord, ParsedFields, RawIngestMessage,
};
