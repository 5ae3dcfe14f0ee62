//! Concurrency-safe collections.
//!
//! - [`GuardedMap`]: a map serialized through one lock, safe for any number of
//!   concurrent writers.
//! - [`iterate`]: a one-shot lazy walk over a map, produced by a background task
//!   through a bounded, back-pressured queue.
//! - [`tally`]: message-type counting that feeds plain key/value data into both.

/// Lock-guarded key/value map.
pub mod guarded_map;
/// Background map walk over a bounded queue.
pub mod snapshot;
pub mod tally;

pub use guarded_map::GuardedMap;
pub use snapshot::{DEFAULT_CAPACITY, Entry, Snapshot, SnapshotOptions, WalkOutcome, WalkReport, iterate, iterate_with, iterate_with_token};
pub use tally::{ContactSummary, MessageType, count_per_type};
