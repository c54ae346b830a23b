//! Peer table: the neighbors a node currently has an open channel to.

use crate::transport::{Channel, ChannelId, TransportError};
use mesh_wire::{encode, AnnouncedMode, Message, PeerId};
use std::sync::Arc;
use tracing::{debug, trace};

/// What a node knows about a neighbor's mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PeerMode {
    /// Not announced yet
    #[default]
    Unknown,
    /// Neighbor relays openly
    Public,
    /// Neighbor is hidden behind the given public key
    Hidden(String),
}

impl PeerMode {
    /// Whether the neighbor announced itself as public
    pub fn is_public(&self) -> bool {
        matches!(self, PeerMode::Public)
    }

    /// Whether the neighbor is hidden behind `public_key`
    pub fn is_hidden_as(&self, public_key: &str) -> bool {
        matches!(self, PeerMode::Hidden(key) if key == public_key)
    }
}

impl From<AnnouncedMode> for PeerMode {
    fn from(mode: AnnouncedMode) -> Self {
        match mode {
            AnnouncedMode::Public => PeerMode::Public,
            AnnouncedMode::Hidden(key) => PeerMode::Hidden(key),
        }
    }
}

/// A directly connected neighbor
#[derive(Debug, Clone)]
pub struct Peer {
    /// Channel to the neighbor
    pub channel: Arc<dyn Channel>,
    /// Neighbor's announced contact count, unknown until INFO carries it
    pub num_contacts: Option<u32>,
    /// Neighbor's announced peer id, unknown until INFO carries it
    pub peer_id: Option<PeerId>,
    /// Neighbor's debug label
    pub debug_name: Option<String>,
    /// Neighbor's announced mode
    pub mode: PeerMode,
}

impl Peer {
    /// Fresh entry with every attribute unknown
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self {
            channel,
            num_contacts: None,
            peer_id: None,
            debug_name: None,
            mode: PeerMode::Unknown,
        }
    }

    /// Local identifier of the channel to this neighbor
    pub fn channel_id(&self) -> ChannelId {
        self.channel.id()
    }

    /// Contact count used for degree balancing; unknown sorts above every known count
    pub fn degree(&self) -> u64 {
        self.num_contacts.map_or(u64::MAX, u64::from)
    }

    /// Encode and send a message to this neighbor
    pub fn send(&self, message: &Message) -> Result<(), TransportError> {
        trace!(
            "Sending {} to {} over {}",
            message.message_type(),
            self.label(),
            self.channel_id()
        );
        self.channel.send(encode(message))
    }

    /// Human readable label for logs
    pub fn label(&self) -> String {
        match (&self.debug_name, self.peer_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => self.channel_id().to_string(),
        }
    }
}

/// Neighbors in connection order
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: Vec<Peer>,
}

impl PeerTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new neighbor for an opened channel
    pub fn register(&mut self, channel: Arc<dyn Channel>) -> &mut Peer {
        debug!("Registering peer on {}", channel.id());
        let index = self.peers.len();
        self.peers.push(Peer::new(channel));
        &mut self.peers[index]
    }

    /// Forget the neighbor on a closed channel
    pub fn remove(&mut self, channel: ChannelId) -> Option<Peer> {
        let index = self.peers.iter().position(|p| p.channel_id() == channel)?;
        Some(self.peers.remove(index))
    }

    /// Neighbor on a channel
    pub fn get(&self, channel: ChannelId) -> Option<&Peer> {
        self.peers.iter().find(|p| p.channel_id() == channel)
    }

    /// Mutable neighbor on a channel
    pub fn get_mut(&mut self, channel: ChannelId) -> Option<&mut Peer> {
        self.peers.iter_mut().find(|p| p.channel_id() == channel)
    }

    /// Neighbor announcing the given id
    pub fn find_by_id(&self, id: PeerId) -> Option<&Peer> {
        self.peers.iter().find(|p| p.peer_id == Some(id))
    }

    /// Whether a neighbor announced the given id
    pub fn contains_id(&self, id: PeerId) -> bool {
        self.find_by_id(id).is_some()
    }

    /// Whether a neighbor other than the one on `except` announced the given id
    pub fn id_taken_by_other(&self, id: PeerId, except: ChannelId) -> bool {
        self.peers
            .iter()
            .any(|p| p.peer_id == Some(id) && p.channel_id() != except)
    }

    /// Neighbors matching a predicate, in connection order
    pub fn filter<F>(&self, predicate: F) -> Vec<&Peer>
    where
        F: Fn(&Peer) -> bool,
    {
        self.peers.iter().filter(|p| predicate(p)).collect()
    }

    /// Neighbors that announced themselves as public
    pub fn public_peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter().filter(|p| p.mode.is_public())
    }

    /// All neighbors in connection order
    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    /// Number of neighbors
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether there are no neighbors
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Send a message to every public neighbor, returning how many accepted it
    pub fn broadcast(&self, message: &Message) -> usize {
        let mut sent = 0;
        for peer in self.public_peers() {
            match peer.send(message) {
                Ok(()) => sent += 1,
                Err(e) => debug!("Dropping broadcast to {}: {}", peer.label(), e),
            }
        }
        sent
    }
}
