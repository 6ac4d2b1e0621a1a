//! Common types and utilities for sources

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared by all source types
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Currently active connections
    pub connections_active: AtomicU64,

    /// Total connections accepted
    pub connections_total: AtomicU64,

    /// Total messages received
    pub messages_received: AtomicU64,

    /// Total bytes received
    pub bytes_received: AtomicU64,

    /// Total records appended to the store
    pub records_stored: AtomicU64,

    /// Total errors encountered
    pub errors: AtomicU64,
}

impl SourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            records_stored: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Increment active connections
    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement active connections
    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record received message
    #[inline]
    pub fn message_received(&self, bytes: u64) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record stored record
    #[inline]
    pub fn record_stored(&self) {
        self.records_stored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record error
    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            records_stored: self.records_stored.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of metrics
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
    pub records_stored: u64,
    pub errors: u64,
}
