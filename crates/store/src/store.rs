//! Bounded FIFO record store

use std::collections::VecDeque;

use parking_lot::RwLock;

use shepherd_protocol::LogRecord;

/// Default capacity for the record store
pub const DEFAULT_CAPACITY: usize = 1000;

/// Maximum capacity to prevent memory issues
const MAX_CAPACITY: usize = 100_000;

/// Outcome of an acknowledgment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Record found; it is now acknowledged (idempotent - repeat calls on
    /// an already-acknowledged record also report this)
    Acknowledged,
    /// No record with that id exists (never ingested, or already evicted)
    NotFound,
}

/// Aggregate statistics over the stored records
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreStats {
    /// Records currently held
    pub total: usize,
    /// Records with `parsed.status_code >= 400`
    pub error_count: usize,
    /// Records with `parsed.status_code < 400`
    pub success_count: usize,
    /// `error_count / total`, 0.0 when empty
    pub error_rate: f64,
}

/// Bounded, ordered, in-memory record history
///
/// Insertion order is preserved; appending beyond capacity evicts from the
/// head. Safe for concurrent use from any number of tasks.
#[derive(Debug)]
pub struct RecordStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    /// Records in insertion order, oldest first
    records: VecDeque<LogRecord>,
    /// Total records ever appended (including evicted)
    total_appended: u64,
    /// Capacity
    capacity: usize,
}

impl RecordStore {
    /// Create a store with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store with the given capacity (clamped to a sane maximum)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        Self {
            inner: RwLock::new(StoreInner {
                records: VecDeque::with_capacity(capacity),
                total_appended: 0,
                capacity,
            }),
        }
    }

    /// Append a record, evicting the oldest if over capacity
    pub fn append(&self, record: LogRecord) {
        let mut inner = self.inner.write();
        if inner.records.len() == inner.capacity {
            inner.records.pop_front();
        }
        inner.records.push_back(record);
        inner.total_appended += 1;
    }

    /// Look up a record by id
    ///
    /// Returns a clone; evicted or unknown ids return `None`.
    pub fn find_by_id(&self, id: &str) -> Option<LogRecord> {
        self.inner
            .read()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Acknowledge a record by id
    ///
    /// First acknowledgment wins: repeated calls are no-op successes and
    /// `acknowledged_at` keeps the timestamp of the first call.
    pub fn acknowledge(&self, id: &str, at_time: f64) -> AckOutcome {
        let mut inner = self.inner.write();
        match inner.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                if !record.acknowledged {
                    record.acknowledged = true;
                    record.acknowledged_at = Some(at_time);
                }
                AckOutcome::Acknowledged
            }
            None => AckOutcome::NotFound,
        }
    }

    /// Point-in-time copy of up to the `limit` most recent records
    ///
    /// Records come back in insertion order. Later mutations (acknowledgment,
    /// eviction) are not visible through the returned copies.
    pub fn snapshot(&self, limit: usize) -> Vec<LogRecord> {
        let inner = self.inner.read();
        let skip = inner.records.len().saturating_sub(limit);
        inner.records.iter().skip(skip).cloned().collect()
    }

    /// Aggregate statistics over the current contents
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        let total = inner.records.len();
        let error_count = inner.records.iter().filter(|r| r.parsed.is_error()).count();
        StoreStats {
            total,
            error_count,
            success_count: total - error_count,
            error_rate: if total == 0 {
                0.0
            } else {
                error_count as f64 / total as f64
            },
        }
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.inner.read().capacity
    }

    /// Total records ever appended, including evicted ones
    pub fn total_appended(&self) -> u64 {
        self.inner.read().total_appended
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
