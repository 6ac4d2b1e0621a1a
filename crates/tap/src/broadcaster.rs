//! Broadcaster - the fan-out point between ingestion and subscribers
//!
//! `Broadcaster` is what the ingestion path calls for every enriched
//! record. It is built to cost nothing when no one is watching: a relaxed
//! atomic check guards the hot path, and all bookkeeping happens only while
//! subscribers exist.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use shepherd_protocol::LogRecord;

use crate::error::Result;
use crate::subscriber::{SubscriberManager, DEFAULT_CHANNEL_BUFFER, DEFAULT_MAX_SUBSCRIBERS};

/// Interval for the disconnected-subscriber cleanup backstop
const CLEANUP_INTERVAL: Duration = Duration::from_secs(5);

/// The fan-out point for live streaming
#[derive(Debug)]
pub struct Broadcaster {
    /// Subscriber manager
    subscribers: SubscriberManager,
    /// Quick check flag for the hot path
    has_subscribers: AtomicBool,
    /// Total records published
    published: AtomicU64,
    /// Total successful per-subscriber deliveries
    delivered: AtomicU64,
}

impl Broadcaster {
    /// Create a broadcaster with default limits
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_SUBSCRIBERS, DEFAULT_CHANNEL_BUFFER)
    }

    /// Create a broadcaster with explicit subscriber/channel limits
    pub fn with_limits(max_subscribers: usize, channel_buffer: usize) -> Self {
        Self {
            subscribers: SubscriberManager::with_limits(max_subscribers, channel_buffer),
            has_subscribers: AtomicBool::new(false),
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    /// Publish a record to all current subscribers
    ///
    /// This is the hot path - with no subscribers it is a single atomic
    /// load. Delivery failures remove the failing subscriber and never
    /// surface to the caller.
    pub fn publish(&self, record: Arc<LogRecord>) {
        if !self.has_subscribers.load(Ordering::Relaxed) {
            return;
        }

        self.published.fetch_add(1, Ordering::Relaxed);

        let sent = self.subscribers.broadcast(record);
        if sent > 0 {
            self.delivered.fetch_add(sent as u64, Ordering::Relaxed);
        }

        // Broadcast may have pruned failed subscribers
        if !self.subscribers.has_subscribers() {
            self.has_subscribers.store(false, Ordering::Relaxed);
        }
    }

    /// Register a new subscriber
    ///
    /// Returns the subscriber ID and the receiving half of its channel.
    pub fn subscribe(&self) -> Result<(u64, mpsc::Receiver<Arc<LogRecord>>)> {
        let (id, receiver) = self.subscribers.subscribe()?;
        self.has_subscribers.store(true, Ordering::Relaxed);
        debug!(id, "subscriber registered");
        Ok((id, receiver))
    }

    /// Unregister a subscriber (idempotent)
    pub fn unsubscribe(&self, id: u64) {
        if self.subscribers.unsubscribe(id) {
            debug!(id, "subscriber removed");
        }

        if !self.subscribers.has_subscribers() {
            self.has_subscribers.store(false, Ordering::Relaxed);
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.count()
    }

    /// Check if there are any subscribers
    #[inline]
    pub fn has_subscribers(&self) -> bool {
        self.has_subscribers.load(Ordering::Relaxed)
    }

    /// Get broadcast statistics
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            subscriber_count: self.subscribers.count(),
        }
    }

    /// Remove subscribers whose receiver has been dropped
    pub fn cleanup(&self) -> usize {
        let removed = self.subscribers.cleanup_disconnected();

        if removed > 0 {
            debug!(removed, "cleaned up disconnected subscribers");
            if !self.subscribers.has_subscribers() {
                self.has_subscribers.store(false, Ordering::Relaxed);
            }
        }

        removed
    }

    /// Spawn the periodic cleanup task
    ///
    /// Failed sends already prune subscribers during broadcast; this task
    /// catches receivers dropped while no records are flowing.
    pub fn spawn_maintenance(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let broadcaster = Arc::clone(self);

        tokio::spawn(async move {
            let mut cleanup_interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                cleanup_interval.tick().await;
                broadcaster.cleanup();
            }
        })
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the broadcaster
#[derive(Debug, Clone, Copy)]
pub struct BroadcastStats {
    /// Records published while subscribers existed
    pub published: u64,
    /// Successful per-subscriber deliveries
    pub delivered: u64,
    /// Current number of subscribers
    pub subscriber_count: usize,
}

#[cfg(test)]
#[path = "broadcaster_test.rs"]
mod tests;
