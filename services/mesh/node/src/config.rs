//! Node configuration

use mesh_session::DEFAULT_HANDSHAKE_TIMEOUT;
use mesh_storage::{DEFAULT_SEEN_CAPACITY, DEFAULT_SEEN_TTL, MIN_SEEN_TTL};
use std::time::Duration;
use tracing::warn;

/// Default period of the maintenance sweep
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Shortest handshake timeout a node accepts
pub const MIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Shortest sweep period a node accepts
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Per-node settings
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Label announced to neighbors and used in logs
    pub debug_name: Option<String>,
    /// How long an originated offer waits for its answer
    pub handshake_timeout: Duration,
    /// Number of search identifiers remembered for dedup
    pub seen_capacity: usize,
    /// How long a search identifier is remembered
    pub seen_ttl: Duration,
    /// Period of the sweep that expires handshakes and seen entries
    pub sweep_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            debug_name: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            seen_capacity: DEFAULT_SEEN_CAPACITY,
            seen_ttl: DEFAULT_SEEN_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl NodeConfig {
    /// Defaults with a debug label
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            debug_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Raise every limit that would disable dedup, handshakes, or the sweep
    /// to its minimum, warning about each one.
    pub fn validated(mut self) -> Self {
        if self.seen_capacity == 0 {
            warn!("Seen capacity of 0 would disable search dedup, using 1");
            self.seen_capacity = 1;
        }
        if self.seen_ttl < MIN_SEEN_TTL {
            warn!("Seen ttl {:?} is below {:?}, raising it", self.seen_ttl, MIN_SEEN_TTL);
            self.seen_ttl = MIN_SEEN_TTL;
        }
        if self.handshake_timeout < MIN_HANDSHAKE_TIMEOUT {
            warn!(
                "Handshake timeout {:?} is below {:?}, raising it",
                self.handshake_timeout, MIN_HANDSHAKE_TIMEOUT
            );
            self.handshake_timeout = MIN_HANDSHAKE_TIMEOUT;
        }
        if self.sweep_interval < MIN_SWEEP_INTERVAL {
            warn!("Sweep interval of 0 is not allowed, using {:?}", MIN_SWEEP_INTERVAL);
            self.sweep_interval = MIN_SWEEP_INTERVAL;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_raises_zero_limits() {
        let config = NodeConfig {
            debug_name: Some("zero".to_string()),
            handshake_timeout: Duration::ZERO,
            seen_capacity: 0,
            seen_ttl: Duration::ZERO,
            sweep_interval: Duration::ZERO,
        }
        .validated();

        assert_eq!(config.seen_capacity, 1);
        assert_eq!(config.seen_ttl, MIN_SEEN_TTL);
        assert_eq!(config.handshake_timeout, MIN_HANDSHAKE_TIMEOUT);
        assert_eq!(config.sweep_interval, MIN_SWEEP_INTERVAL);
        assert_eq!(config.debug_name.as_deref(), Some("zero"));
    }

    #[test]
    fn test_validated_keeps_sane_limits() {
        let config = NodeConfig::named("n").validated();

        assert_eq!(config.seen_capacity, DEFAULT_SEEN_CAPACITY);
        assert_eq!(config.seen_ttl, DEFAULT_SEEN_TTL);
        assert_eq!(config.handshake_timeout, DEFAULT_HANDSHAKE_TIMEOUT);
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
    }
}
