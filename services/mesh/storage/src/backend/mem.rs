//! In-memory seen store

use crate::{SeenConfig, SeenStore, MIN_SEEN_TTL};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// In-memory seen store with FIFO eviction and a retention window
#[derive(Debug)]
pub struct MemorySeenStore {
    /// Identifier -> time first seen
    entries: HashMap<String, Instant>,
    /// Identifiers in insertion order
    order: VecDeque<String>,
    config: SeenConfig,
}

impl MemorySeenStore {
    /// Create a store with the given limits.
    ///
    /// A zero capacity or retention window would disable dedup, so both are
    /// raised to their minimum.
    pub fn new(mut config: SeenConfig) -> Self {
        if config.capacity == 0 {
            warn!("Seen capacity of 0 disables dedup, using 1");
            config.capacity = 1;
        }
        if config.ttl < MIN_SEEN_TTL {
            warn!("Seen ttl {:?} is below {:?}, raising it", config.ttl, MIN_SEEN_TTL);
            config.ttl = MIN_SEEN_TTL;
        }
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            config,
        }
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self.order.pop_front() {
            self.entries.remove(&oldest);
            trace!("Evicted seen identifier at capacity {}", self.config.capacity);
        }
    }
}

impl Default for MemorySeenStore {
    fn default() -> Self {
        Self::new(SeenConfig::default())
    }
}

impl SeenStore for MemorySeenStore {
    fn check_and_mark(&mut self, identifier: &str, now: Instant) -> bool {
        self.purge_expired(now);

        if self.entries.contains_key(identifier) {
            return false;
        }

        while self.entries.len() >= self.config.capacity {
            self.evict_oldest();
        }

        self.entries.insert(identifier.to_string(), now);
        self.order.push_back(identifier.to_string());
        true
    }

    fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let mut purged = 0;

        // Insertion order is also age order, so expired entries sit at the front
        while let Some(oldest) = self.order.front() {
            let expired = self
                .entries
                .get(oldest)
                .map(|seen_at| now.saturating_duration_since(*seen_at) >= self.config.ttl)
                .unwrap_or(true);
            if !expired {
                break;
            }
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                purged += 1;
            }
        }

        if purged > 0 {
            debug!("Purged {} expired seen identifiers", purged);
        }
        purged
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
