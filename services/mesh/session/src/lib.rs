//! Channel transport seam, in-memory transport, peer table, and pending handshakes for mesh.
//!
//! This crate holds everything a node needs to know about its direct
//! neighbors: how channels to them are opened and closed, what each neighbor
//! has announced about itself, and which originated connections are still
//! waiting for an answer.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mesh_session::{MemoryNetwork, Transport, TransportEvent};
//!
//! # async fn example() -> Result<(), mesh_session::TransportError> {
//! let network = MemoryNetwork::new();
//! let (alice, mut alice_events) = network.transport();
//! let (bob, _bob_events) = network.transport();
//!
//! let (offer, acceptor) = alice.originate().await?;
//! let answer = bob.accept(&offer).await?;
//! acceptor.accept_answer(&answer)?;
//!
//! if let Some(TransportEvent::Opened(channel)) = alice_events.recv().await {
//!     channel.send("{\"type\":0}".to_string())?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod handshake;
pub mod memory;
pub mod peer;
pub mod transport;

// Re-export main types
pub use handshake::{PendingHandshake, DEFAULT_HANDSHAKE_TIMEOUT};
pub use memory::{MemoryAnswerAcceptor, MemoryChannel, MemoryNetwork, MemoryTransport};
pub use peer::{Peer, PeerMode, PeerTable};
pub use transport::{
    connect, AnswerAcceptor, Channel, ChannelId, EventReceiver, EventSender, Transport, TransportError,
    TransportEvent,
};
