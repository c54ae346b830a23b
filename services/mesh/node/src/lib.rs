//! Peer protocol state machine for the social mesh.
//!
//! A [`Node`] owns its peer table, pending handshakes, and search dedup
//! cache. It consumes [`TransportEvent`](mesh_session::TransportEvent)s one
//! at a time and reacts with protocol messages:
//!
//! - mesh growth (`INFO`, `ASK_TO_SOCIALIZE`, `SOCIALIZE`, `SOCIALIZE_BACK`,
//!   `CONNECT`) adds edges towards the least connected neighbors
//! - rendezvous (`ASK_AROUND`, `BACKTRACK`) lets two hidden nodes sharing a
//!   keypair find each other through public relays
//!
//! ## Example
//!
//! ```rust,no_run
//! use mesh_identity::Mode;
//! use mesh_node::{Node, NodeConfig};
//! use mesh_session::MemoryNetwork;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let network = MemoryNetwork::new();
//! let (transport, events) = network.transport();
//! let node = Node::new(NodeConfig::named("relay"), Mode::Public, Arc::new(transport));
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel(1);
//! let node = node.run(events, shutdown_rx).await;
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod node;
pub mod rendezvous;
mod router;
mod social;

pub use config::{NodeConfig, DEFAULT_SWEEP_INTERVAL, MIN_HANDSHAKE_TIMEOUT, MIN_SWEEP_INTERVAL};
pub use error::{ProtocolError, ProtocolResult};
pub use node::Node;
pub use rendezvous::compress_path;
