//! Shepherd Tap - live record fan-out
//!
//! This crate delivers ingested records to live subscribers in real time.
//! Delivery is best-effort: each subscriber gets a bounded channel, sends
//! are non-blocking attempts, and a subscriber whose send fails (channel
//! full or receiver gone) is removed during that same broadcast, so one
//! stalled viewer never delays the rest or the ingestion path.
//!
//! # Architecture
//!
//! ```text
//! IngestSource
//!     │
//!     ▼
//! Broadcaster ◄── zero cost with no subscribers
//!     │
//!     ▼
//! SubscriberManager ── per-subscriber mpsc channels
//!     │
//!     ▼
//! WebSocket clients
//! ```

mod broadcaster;
mod error;
mod subscriber;

pub use broadcaster::{BroadcastStats, Broadcaster};
pub use error::{Result, TapError};
pub use subscriber::{Subscriber, SubscriberManager};
