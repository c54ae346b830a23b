//! Configuration handling for the social mesh binary.
//!
//! Settings are read from the `mesh` section of a YAML file. Missing keys keep
//! their defaults, and environment variables override whatever the file says.

use anyhow::Result;
use mesh_node::NodeConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Default port of the bootstrap listener
pub const DEFAULT_BOOTSTRAP_PORT: u16 = 9870;

/// Binary configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Bootstrap listener settings
    pub bootstrap: BootstrapConfig,
    /// Per-node protocol settings
    pub node: NodeSettings,
    /// In-process simulation settings
    pub simulation: SimulationConfig,
}

/// Bootstrap listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// TCP port to listen on
    pub port: u16,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_BOOTSTRAP_PORT,
        }
    }
}

/// Protocol settings shared by every node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Seconds an originated offer waits for its answer
    pub handshake_timeout_secs: u64,
    /// Search identifiers remembered for dedup
    pub seen_capacity: usize,
    /// Seconds a search identifier is remembered
    pub seen_ttl_secs: u64,
    /// Milliseconds between maintenance sweeps
    pub sweep_interval_ms: u64,
}

impl Default for NodeSettings {
    fn default() -> Self {
        let defaults = NodeConfig::default();
        Self {
            handshake_timeout_secs: defaults.handshake_timeout.as_secs(),
            seen_capacity: defaults.seen_capacity,
            seen_ttl_secs: defaults.seen_ttl.as_secs(),
            sweep_interval_ms: defaults.sweep_interval.as_millis() as u64,
        }
    }
}

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Public nodes bootstrapped to the bootstrapper
    pub base_nodes: usize,
    /// Seconds to wait for the hidden nodes to meet
    pub timeout_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_nodes: 10,
            timeout_secs: 30,
        }
    }
}

/// Root configuration structure (matches the YAML structure)
#[derive(Debug, Deserialize)]
struct RootConfig {
    mesh: Option<MeshConfig>,
}

impl MeshConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<RootConfig>(&content) {
                Ok(root) => {
                    info!("Loaded configuration from {:?}", path);
                    root.mesh.unwrap_or_default()
                }
                Err(e) => {
                    warn!("Failed to parse config file {:?}, using defaults: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                warn!("Config file {:?} not found, using defaults", path);
                Self::default()
            }
        };

        config.apply_environment_overrides();
        config.validate();

        info!(
            "Final mesh configuration: bootstrap_port={}, handshake_timeout={}s, seen_capacity={}, base_nodes={}",
            config.bootstrap.port,
            config.node.handshake_timeout_secs,
            config.node.seen_capacity,
            config.simulation.base_nodes
        );

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_environment_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT is honoured for compatibility with plain bootstrap deployments
        for key in ["PORT", "MESH_BOOTSTRAP_PORT"] {
            if let Some(port) = lookup(key).and_then(|v| v.parse::<u16>().ok()) {
                self.bootstrap.port = port;
                info!("Bootstrap port overridden by {}: {}", key, port);
            }
        }

        if let Some(secs) = lookup("MESH_HANDSHAKE_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            self.node.handshake_timeout_secs = secs;
            info!("Handshake timeout overridden by environment: {}s", secs);
        }

        if let Some(capacity) = lookup("MESH_SEEN_CAPACITY").and_then(|v| v.parse::<usize>().ok()) {
            self.node.seen_capacity = capacity;
            info!("Seen capacity overridden by environment: {}", capacity);
        }

        if let Some(count) = lookup("MESH_BASE_NODES").and_then(|v| v.parse::<usize>().ok()) {
            self.simulation.base_nodes = count;
            info!("Base node count overridden by environment: {}", count);
        }
    }

    /// Raise zero limits to 1. A zero seen capacity or ttl turns off flood
    /// dedup, and a zero handshake timeout expires every pending slot at once.
    pub fn validate(&mut self) {
        let node = &mut self.node;
        for (name, value) in [
            ("handshake_timeout_secs", &mut node.handshake_timeout_secs),
            ("seen_ttl_secs", &mut node.seen_ttl_secs),
            ("sweep_interval_ms", &mut node.sweep_interval_ms),
        ] {
            if *value == 0 {
                warn!("mesh.node.{} must be at least 1, using 1", name);
                *value = 1;
            }
        }
        if node.seen_capacity == 0 {
            warn!("mesh.node.seen_capacity must be at least 1, using 1");
            node.seen_capacity = 1;
        }
    }

    /// Node settings with the given debug label
    pub fn node_config(&self, debug_name: &str) -> NodeConfig {
        NodeConfig {
            debug_name: Some(debug_name.to_string()),
            handshake_timeout: Duration::from_secs(self.node.handshake_timeout_secs),
            seen_capacity: self.node.seen_capacity,
            seen_ttl: Duration::from_secs(self.node.seen_ttl_secs),
            sweep_interval: Duration::from_millis(self.node.sweep_interval_ms),
        }
        .validated()
    }
}
