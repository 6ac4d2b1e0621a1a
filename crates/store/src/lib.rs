//! Shepherd Store - bounded record history
//!
//! The [`RecordStore`] keeps the most recent N ingested records in memory.
//! It is the single piece of shared mutable state in the pipeline: every
//! ingestion connection appends to it and the query surface reads from it
//! concurrently. All operations are guarded by one lock, so readers never
//! observe a partially written record.
//!
//! Eviction is FIFO: appending beyond capacity drops the oldest record,
//! which becomes permanently unreachable. Acknowledgment mutates only the
//! `acknowledged`/`acknowledged_at` fields of a stored record.

mod store;

pub use store::{AckOutcome, RecordStore, StoreStats, DEFAULT_CAPACITY};
