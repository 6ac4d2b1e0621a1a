//! Wire decoding
//!
//! The ingestion wire format is newline-delimited UTF-8 JSON: each line is
//! one independently decodable [`RawIngestMessage`]. Framing (finding line
//! boundaries, bounding line length) is the source's job; this module only
//! decodes a single complete line.

use crate::error::{ProtocolError, Result};
use crate::record::RawIngestMessage;

/// Decode one wire line into a [`RawIngestMessage`]
///
/// The line must not include its trailing newline. Returns
/// [`ProtocolError::EmptyLine`] for blank lines so callers can skip them
/// without logging a decode failure.
pub fn decode_line(line: &[u8]) -> Result<RawIngestMessage> {
    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ProtocolError::EmptyLine);
    }

    Ok(serde_json::from_slice(line)?)
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod tests;
