//! Shared state for API handlers

use std::sync::Arc;
use std::time::Duration;

use shepherd_store::RecordStore;
use shepherd_tap::Broadcaster;

/// State handed to every handler
#[derive(Clone)]
pub struct ApiState {
    /// Shared record store
    pub store: Arc<RecordStore>,

    /// Fan-out point for live subscribers
    pub broadcaster: Arc<Broadcaster>,

    /// WebSocket ping interval
    pub ping_interval: Duration,
}
