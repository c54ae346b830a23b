//! Bounded dedup storage for mesh flood searches.
//!
//! Every relay remembers which searches it has already forwarded so that a
//! flood terminates on a cyclic topology. Searches are keyed by an opaque
//! identifier (originator id followed by the searcher's offer). Entries expire
//! after a time window and the oldest entry is evicted once the store is full,
//! which keeps memory bounded on a long running node.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;

use std::time::{Duration, Instant};

/// Default number of identifiers retained
pub const DEFAULT_SEEN_CAPACITY: usize = 10_000;

/// Default lifetime of an identifier
pub const DEFAULT_SEEN_TTL: Duration = Duration::from_secs(600);

/// Shortest lifetime a store accepts
pub const MIN_SEEN_TTL: Duration = Duration::from_secs(1);

/// Deduplication trait for flooded searches
pub trait SeenStore: Send {
    /// Record an identifier. Returns true if it was not seen before.
    fn check_and_mark(&mut self, identifier: &str, now: Instant) -> bool;

    /// Check whether an identifier is currently remembered
    fn contains(&self, identifier: &str) -> bool;

    /// Drop identifiers older than the retention window, returning how many were dropped
    fn purge_expired(&mut self, now: Instant) -> usize;

    /// Number of identifiers currently remembered
    fn len(&self) -> usize;

    /// Whether nothing is remembered
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Retention limits for a seen store
#[derive(Clone, Debug)]
pub struct SeenConfig {
    /// Maximum identifiers kept before the oldest is evicted
    pub capacity: usize,
    /// How long an identifier is remembered
    pub ttl: Duration,
}

impl Default for SeenConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SEEN_CAPACITY,
            ttl: DEFAULT_SEEN_TTL,
        }
    }
}

pub use backend::mem::MemorySeenStore;
