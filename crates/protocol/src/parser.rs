//! Access-log line parsing
//!
//! Extracts structured fields from NGINX-style access log lines:
//!
//! ```text
//! IP - - [timestamp] "METHOD PATH PROTO" STATUS SIZE "REFERER" "USER-AGENT"
//! ```
//!
//! Parsing is a total function: any malformed input degrades field by field
//! to the defaults in [`ParsedFields::default`], and the caller never sees
//! an error. The quote character partitions the line; everything else is
//! whitespace tokenization.

use crate::record::ParsedFields;

/// Parse an access-log line into structured fields
///
/// Never fails - fields that cannot be extracted keep their defaults
/// (`status_code=500`, `client_ip="unknown"`, `method="UNKNOWN"`,
/// `path="/"`, `response_size=0`, `user_agent="unknown"`).
pub fn parse_access_log(raw_line: &str) -> ParsedFields {
    let mut fields = ParsedFields::default();

    if raw_line.trim().is_empty() {
        return fields;
    }

    let segments: Vec<&str> = raw_line.split('"').collect();

    if segments.len() < 3 {
        // No quoted request section. Salvage the client IP from the first
        // whitespace token, leave everything else at defaults.
        if let Some(first) = raw_line.split_whitespace().next() {
            fields.client_ip = first.to_string();
        }
        return fields;
    }

    // Segment 0: "IP - - [timestamp] " - first token is the client IP
    if let Some(ip) = segments[0].trim().split_whitespace().next() {
        fields.client_ip = ip.to_string();
    }

    // Segment 1: "METHOD PATH PROTO"
    let mut request = segments[1].split_whitespace();
    if let Some(method) = request.next() {
        fields.method = method.to_string();
    }
    if let Some(path) = request.next() {
        fields.path = path.to_string();
    }

    // Segment 2: " STATUS SIZE " between request and referer
    let mut status_size = segments[2].trim().split_whitespace();
    if let Some(status) = status_size.next() {
        fields.status_code = status.parse().unwrap_or(500);
    }
    if let Some(size) = status_size.next() {
        fields.response_size = size.parse().unwrap_or(0);
    }

    // Combined format carries "REFERER" (segment 3) then "USER-AGENT"
    // (segment 5); shorter lines have the user agent as the only quoted
    // string after the status section.
    if let Some(agent) = segments.get(5).or_else(|| segments.get(3)) {
        fields.user_agent = agent.to_string();
    }

    fields
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
