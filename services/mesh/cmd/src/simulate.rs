//! In-process mesh simulation.
//!
//! Builds a bootstrapper, a set of public base nodes bootstrapped to it, and
//! two hidden nodes sharing one keypair, each bootstrapped to a random base
//! node. Every node runs on its own task; the run ends once the hidden nodes
//! have met or the timeout passes.

use crate::config::MeshConfig;
use anyhow::{bail, Result};
use futures::future::join_all;
use mesh_identity::{KeyPair, Mode};
use mesh_node::Node;
use mesh_session::{connect, MemoryNetwork, MemoryTransport};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct Running {
    transport: MemoryTransport,
    shutdown: mpsc::Sender<()>,
    rendezvous: watch::Receiver<u64>,
    handle: JoinHandle<Node>,
}

impl Running {
    fn spawn(network: &MemoryNetwork, config: &MeshConfig, name: &str, mode: Mode) -> Self {
        let (transport, events) = network.transport();
        let node = Node::new(config.node_config(name), mode, Arc::new(transport.clone()));
        let rendezvous = node.watch_rendezvous();
        let (shutdown, shutdown_rx) = mpsc::channel(1);

        Self {
            transport,
            shutdown,
            rendezvous,
            handle: tokio::spawn(node.run(events, shutdown_rx)),
        }
    }
}

/// Outcome of a simulation run
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Nodes in the mesh, including the bootstrapper and hidden nodes
    pub nodes: usize,
    /// Direct edges when the run ended
    pub edges: usize,
    /// Whether the hidden nodes ended up directly connected
    pub hidden_connected: bool,
    /// Searches completed by the hidden nodes
    pub rendezvous: u64,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// Run one simulation with the configured sizes
pub async fn run(config: &MeshConfig) -> Result<SimulationReport> {
    let base_count = config.simulation.base_nodes;
    if base_count == 0 {
        bail!("Simulation needs at least one base node");
    }

    let started = Instant::now();
    let network = MemoryNetwork::new();
    let mut running = Vec::with_capacity(base_count + 3);

    running.push(Running::spawn(&network, config, "bootstrapper", Mode::Public));
    for i in 0..base_count {
        let node = Running::spawn(&network, config, &i.to_string(), Mode::Public);
        connect(&node.transport, &running[0].transport).await?;
        running.push(node);
    }
    component_info!("sim", "Bootstrapped {} base nodes", base_count);

    let key_pair = KeyPair::generate();
    let a = Running::spawn(&network, config, "A", Mode::Hidden(key_pair.clone()));
    let b = Running::spawn(&network, config, "B", Mode::Hidden(key_pair));

    let (via_a, via_b) = {
        let mut rng = rand::thread_rng();
        (rng.gen_range(1..=base_count), rng.gen_range(1..=base_count))
    };
    let (joined_a, joined_b) = futures::join!(
        connect(&a.transport, &running[via_a].transport),
        connect(&b.transport, &running[via_b].transport),
    );
    joined_a?;
    joined_b?;
    component_info!("sim", "Hidden nodes joined via {} and {}", via_a - 1, via_b - 1);

    let mut watch_a = a.rendezvous.clone();
    let mut watch_b = b.rendezvous.clone();
    let timeout = Duration::from_secs(config.simulation.timeout_secs);
    let waited = tokio::time::timeout(timeout, async {
        tokio::select! {
            _ = watch_a.wait_for(|count| *count > 0) => {}
            _ = watch_b.wait_for(|count| *count > 0) => {}
        }
    })
    .await;
    if waited.is_err() {
        component_warn!("sim", "Hidden nodes did not meet within {:?}", timeout);
    }

    // let the new edge settle before stopping
    tokio::time::sleep(Duration::from_millis(50)).await;

    running.push(a);
    running.push(b);
    for node in &running {
        let _ = node.shutdown.send(()).await;
    }

    let mut nodes = Vec::with_capacity(running.len());
    for result in join_all(running.into_iter().map(|r| r.handle)).await {
        nodes.push(result?);
    }

    let edges = nodes.iter().map(|n| n.peers().len()).sum::<usize>() / 2;
    let (hidden_a, hidden_b) = (&nodes[nodes.len() - 2], &nodes[nodes.len() - 1]);
    let report = SimulationReport {
        nodes: nodes.len(),
        edges,
        hidden_connected: hidden_a.peers().contains_id(hidden_b.peer_id()),
        rendezvous: hidden_a.rendezvous_completions() + hidden_b.rendezvous_completions(),
        elapsed: started.elapsed(),
    };

    component_info!(
        "sim",
        "Simulation finished: nodes={} edges={} hidden_connected={} rendezvous={} elapsed={:?}",
        report.nodes,
        report.edges,
        report.hidden_connected,
        report.rendezvous,
        report.elapsed
    );
    Ok(report)
}
