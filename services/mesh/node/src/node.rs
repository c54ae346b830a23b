//! Node facade: per-node state and the channel lifecycle.

use crate::config::NodeConfig;
use crate::error::{ProtocolError, ProtocolResult};
use mesh_identity::Mode;
use mesh_session::{
    Channel, ChannelId, EventReceiver, Peer, PeerTable, PendingHandshake, Transport,
    TransportEvent,
};
use mesh_storage::{MemorySeenStore, SeenConfig, SeenStore};
use mesh_wire::{AnnouncedMode, AskAround, Info, Message, PeerId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

/// A mesh participant.
///
/// All protocol state lives here and is only touched from [`Node::handle_event`],
/// one event at a time, so handlers never race each other.
pub struct Node {
    pub(crate) config: NodeConfig,
    pub(crate) peer_id: PeerId,
    pub(crate) mode: Mode,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) peers: PeerTable,
    pub(crate) answer_socialize: PendingHandshake,
    pub(crate) final_connect: PendingHandshake,
    pub(crate) seen: MemorySeenStore,
    pub(crate) rendezvous: watch::Sender<u64>,
}

impl Node {
    /// Create a node with a fresh random peer id
    pub fn new(config: NodeConfig, mode: Mode, transport: Arc<dyn Transport>) -> Self {
        let config = config.validated();
        let seen = MemorySeenStore::new(SeenConfig {
            capacity: config.seen_capacity,
            ttl: config.seen_ttl,
        });
        let (rendezvous, _) = watch::channel(0);
        let peer_id = PeerId(rand::random());

        info!(
            "Created {} node {} ({})",
            if mode.is_public() { "public" } else { "hidden" },
            config.debug_name.as_deref().unwrap_or("unnamed"),
            peer_id
        );

        Self {
            answer_socialize: PendingHandshake::new("socialize", config.handshake_timeout),
            final_connect: PendingHandshake::new("rendezvous", config.handshake_timeout),
            config,
            peer_id,
            mode,
            transport,
            peers: PeerTable::new(),
            seen,
            rendezvous,
        }
    }

    /// This node's peer id
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// This node's debug label
    pub fn debug_name(&self) -> Option<&str> {
        self.config.debug_name.as_deref()
    }

    /// Current neighbors
    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// Whether this node relays openly
    pub fn is_public(&self) -> bool {
        self.mode.is_public()
    }

    /// Whether a mesh-growth handshake is awaiting its answer
    pub fn has_pending_socialize(&mut self) -> bool {
        self.answer_socialize.is_pending(Instant::now())
    }

    /// Whether a rendezvous search is awaiting its answer
    pub fn has_pending_rendezvous(&mut self) -> bool {
        self.final_connect.is_pending(Instant::now())
    }

    /// Number of searches this node completed
    pub fn rendezvous_completions(&self) -> u64 {
        *self.rendezvous.borrow()
    }

    /// Observe the completed search count while the node runs on its own task
    pub fn watch_rendezvous(&self) -> watch::Receiver<u64> {
        self.rendezvous.subscribe()
    }

    pub(crate) fn label(&self) -> String {
        match &self.config.debug_name {
            Some(name) => name.clone(),
            None => self.peer_id.to_string(),
        }
    }

    pub(crate) fn peer(&self, channel: ChannelId) -> ProtocolResult<&Peer> {
        self.peers.get(channel).ok_or(ProtocolError::UnknownPeer)
    }

    pub(crate) fn peer_mut(&mut self, channel: ChannelId) -> ProtocolResult<&mut Peer> {
        self.peers.get_mut(channel).ok_or(ProtocolError::UnknownPeer)
    }

    /// Process exactly one transport event
    pub async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened(channel) => self.greet(channel).await,
            TransportEvent::Message { channel, text } => self.dispatch(channel, &text).await,
            TransportEvent::Closed { channel } => self.on_closed(channel),
        }
    }

    /// Welcome a freshly opened channel.
    ///
    /// Registers the neighbor, tells existing public neighbors the new contact
    /// count, and announces this node to the newcomer. A hidden node also
    /// starts a rendezvous search through every new edge.
    pub async fn greet(&mut self, channel: Arc<dyn Channel>) {
        let channel_id = channel.id();
        self.peers.register(channel);

        let count = u32::try_from(self.peers.len()).unwrap_or(u32::MAX);
        self.peers.broadcast(&Message::Info(Info::contacts(count)));

        let announce = Info::announce(
            self.config.debug_name.clone(),
            self.peer_id,
            AnnouncedMode::from(&self.mode),
        );
        debug!("{} announcing itself on {}", self.label(), channel_id);
        if let Err(e) = self.send_to(channel_id, &Message::Info(announce)) {
            debug!("Failed to announce on {}: {}", channel_id, e);
            return;
        }

        match self.start_search().await {
            Ok(Some(ask)) => {
                if let Err(e) = self.send_to(channel_id, &Message::AskAround(ask)) {
                    debug!("Failed to start search on {}: {}", channel_id, e);
                }
            }
            Ok(None) => {}
            Err(e) => debug!("Failed to start search on {}: {}", channel_id, e),
        }
    }

    /// Restart the rendezvous search through every public neighbor.
    /// Returns how many neighbors the search was sent to.
    pub async fn search(&mut self) -> ProtocolResult<usize> {
        match self.start_search().await? {
            Some(ask) => Ok(self.peers.broadcast(&Message::AskAround(ask))),
            None => {
                debug!("{} is public and has nothing to search for", self.label());
                Ok(0)
            }
        }
    }

    fn on_closed(&mut self, channel: ChannelId) {
        match self.peers.remove(channel) {
            Some(peer) => debug!("{} closing {}", self.label(), peer.label()),
            None => trace!("Close for unknown channel {}", channel),
        }
    }

    /// Drop handshakes and seen entries past their lifetime
    pub fn sweep(&mut self) {
        let now = Instant::now();
        self.answer_socialize.expire(now);
        self.final_connect.expire(now);

        let purged = self.seen.purge_expired(now.into_std());
        if purged > 0 {
            trace!("{} forgot {} search identifiers", self.label(), purged);
        }
    }

    /// Run the node until its event queue closes or a shutdown signal arrives.
    /// Returns the node so callers can inspect its final state.
    pub async fn run(mut self, mut events: EventReceiver, mut shutdown: mpsc::Receiver<()>) -> Self {
        info!("Starting mesh node {} ({})", self.label(), self.peer_id);

        let mut sweep = interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("Mesh node {} event queue closed", self.label());
                        break;
                    }
                },

                _ = sweep.tick() => self.sweep(),

                _ = shutdown.recv() => {
                    info!("Mesh node {} shutting down", self.label());
                    break;
                }
            }
        }

        self
    }

    pub(crate) fn send_to(&self, channel: ChannelId, message: &Message) -> ProtocolResult<()> {
        self.peer(channel)?.send(message)?;
        Ok(())
    }

    pub(crate) fn record_rendezvous(&self) {
        self.rendezvous.send_modify(|count| *count += 1);
    }

    // Originates an offer, parks its acceptor and signs the first hop.
    async fn start_search(&mut self) -> ProtocolResult<Option<AskAround>> {
        let Some(key_pair) = self.mode.key_pair().cloned() else {
            return Ok(None);
        };

        let (offer, acceptor) = self.transport.originate().await?;
        self.final_connect.replace(acceptor, Instant::now());

        let signature = key_pair.sign(mesh_wire::signed_payload(self.peer_id, &offer).as_bytes());
        Ok(Some(AskAround {
            offer,
            path: vec![self.peer_id],
            signature,
            public_key: key_pair.public_key_hex().to_string(),
        }))
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("peer_id", &self.peer_id)
            .field("debug_name", &self.config.debug_name)
            .field("public", &self.mode.is_public())
            .field("peers", &self.peers.len())
            .finish()
    }
}
