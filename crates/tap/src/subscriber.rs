//! Subscriber management for live streaming
//!
//! Each connected viewer gets a `Subscriber` instance holding its unique id
//! and the sending half of a bounded channel. The `SubscriberManager`
//! handles registration, removal, and fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use shepherd_protocol::LogRecord;

use crate::error::{Result, TapError};

/// Counter for generating unique subscriber IDs
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Default maximum number of concurrent subscribers
pub(crate) const DEFAULT_MAX_SUBSCRIBERS: usize = 100;

/// Default channel buffer size per subscriber
pub(crate) const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// A single live subscriber (connected viewer)
#[derive(Debug)]
pub struct Subscriber {
    /// Unique identifier
    id: u64,
    /// Channel sender for record delivery
    sender: mpsc::Sender<Arc<LogRecord>>,
}

impl Subscriber {
    fn new(sender: mpsc::Sender<Arc<LogRecord>>) -> Self {
        Self {
            id: SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            sender,
        }
    }

    /// Get the subscriber ID
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Try to deliver a record without blocking
    ///
    /// Returns false when the channel is full or the receiver is gone -
    /// either way the subscriber cannot keep up and should be dropped.
    #[inline]
    pub fn try_send(&self, record: Arc<LogRecord>) -> bool {
        self.sender.try_send(record).is_ok()
    }

    /// Check if the receiving side is still attached
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Manages all active subscribers
#[derive(Debug)]
pub struct SubscriberManager {
    /// Active subscribers
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
    /// Maximum concurrent subscribers
    max_subscribers: usize,
    /// Channel buffer size handed to new subscribers
    channel_buffer: usize,
}

impl SubscriberManager {
    /// Create a manager with default limits
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_SUBSCRIBERS, DEFAULT_CHANNEL_BUFFER)
    }

    /// Create a manager with explicit limits
    pub fn with_limits(max_subscribers: usize, channel_buffer: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            max_subscribers: max_subscribers.max(1),
            channel_buffer: channel_buffer.max(1),
        }
    }

    /// Register a new subscriber
    ///
    /// Returns the subscriber ID and the receiving half of its channel.
    pub fn subscribe(&self) -> Result<(u64, mpsc::Receiver<Arc<LogRecord>>)> {
        let mut subscribers = self.subscribers.write();

        if subscribers.len() >= self.max_subscribers {
            return Err(TapError::MaxSubscribers {
                max: self.max_subscribers,
            });
        }

        let (sender, receiver) = mpsc::channel(self.channel_buffer);
        let subscriber = Arc::new(Subscriber::new(sender));
        let id = subscriber.id();
        subscribers.push(subscriber);

        Ok((id, receiver))
    }

    /// Remove a subscriber by ID
    ///
    /// Idempotent: removing an unknown or already-removed id is a no-op.
    /// Returns whether a subscriber was actually removed.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.write();
        let original_len = subscribers.len();
        subscribers.retain(|s| s.id() != id);
        subscribers.len() < original_len
    }

    /// Get number of active subscribers
    pub fn count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Check if there are any subscribers
    #[inline]
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.read().is_empty()
    }

    /// Deliver a record to every subscriber
    ///
    /// Sends happen against a snapshot of the membership so the structural
    /// lock is never held across channel operations. Any subscriber whose
    /// send fails is removed before this call returns; the others are
    /// unaffected. Returns the number of successful deliveries.
    pub fn broadcast(&self, record: Arc<LogRecord>) -> usize {
        let snapshot: Vec<Arc<Subscriber>> = self.subscribers.read().clone();

        if snapshot.is_empty() {
            return 0;
        }

        let mut sent_count = 0;
        let mut failed: Vec<u64> = Vec::new();

        for subscriber in &snapshot {
            if subscriber.try_send(Arc::clone(&record)) {
                sent_count += 1;
            } else {
                failed.push(subscriber.id());
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write();
            subscribers.retain(|s| !failed.contains(&s.id()));
        }

        sent_count
    }

    /// Remove subscribers whose receiver has been dropped
    ///
    /// Backstop for viewers that disconnect between broadcasts; returns the
    /// number removed.
    pub fn cleanup_disconnected(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        let original_len = subscribers.len();
        subscribers.retain(|s| s.is_connected());
        original_len - subscribers.len()
    }
}

impl Default for SubscriberManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "subscriber_test.rs"]
mod tests;
