use mesh_identity::IdentityError;
use mesh_session::TransportError;
use mesh_wire::{PeerId, WireError};
use thiserror::Error;

/// Why a handler dropped a message. None of these are fatal to the node.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] WireError),

    #[error("Authentication failed: {0}")]
    Authentication(#[from] IdentityError),

    #[error("Public key does not match this node's identity")]
    KeyMismatch,

    #[error("Peer is not connected")]
    UnknownPeer,

    #[error("Stale route: peer {0} is no longer connected")]
    StaleRoute(PeerId),

    #[error("Search path is empty")]
    EmptyPath,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
