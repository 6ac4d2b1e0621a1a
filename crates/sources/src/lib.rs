//! Shepherd Sources
//!
//! Network sources that receive agent data and feed the store/broadcast
//! pipeline.
//!
//! # Available Sources
//!
//! - **Ingest TCP** - newline-delimited JSON ingest messages from agents
//!   (primary and currently only source)
//!
//! # Design Principles
//!
//! - **Async I/O**: built on `tokio`, one task per connection
//! - **Bounded reads**: line length is capped so a misbehaving agent cannot
//!   exhaust memory
//! - **Per-line recovery**: a malformed line is skipped, never fatal to the
//!   connection
//! - **Independent connections**: connections never block each other; the
//!   store serializes the global append order

mod common;
mod ingest;

pub use common::{MetricsSnapshot, SourceMetrics};
pub use ingest::{
    IngestMetricsSnapshot, IngestSource, IngestSourceConfig, IngestSourceError,
    IngestSourceMetrics,
};
