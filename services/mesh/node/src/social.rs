//! Mesh growth.
//!
//! A well connected neighbor N introduces a requester P to N's least
//! connected public neighbor C. The new P-C edge flattens the degree
//! distribution using only two-hop knowledge:
//!
//! ```text
//! P --ASK_TO_SOCIALIZE--> N --SOCIALIZE--> C
//! P <--CONNECT----------- N <--SOCIALIZE_BACK-- C
//! ```

use crate::error::{ProtocolError, ProtocolResult};
use crate::node::Node;
use mesh_session::{ChannelId, Peer};
use mesh_wire::{Info, Message, PeerId};
use rand::seq::SliceRandom;
use tokio::time::Instant;
use tracing::debug;

impl Node {
    pub(crate) async fn on_info(&mut self, channel: ChannelId, info: Info) -> ProtocolResult<()> {
        if let Some(num) = info.num {
            self.peer_mut(channel)?.num_contacts = Some(num);

            if self.mode.is_public() && num > 1 && !self.answer_socialize.is_pending(Instant::now()) {
                self.ask_to_socialize(channel).await?;
            }
        }

        if let Some(name) = info.name {
            debug!("{} -> {}", self.label(), name);
            self.peer_mut(channel)?.debug_name = Some(name);
        }

        if let Some(id) = info.id {
            if self.peers.id_taken_by_other(id, channel) {
                debug!("{} already connected to {}, closing {}", self.label(), id, channel);
                if let Some(peer) = self.peers.remove(channel) {
                    peer.channel.close();
                }
                return Ok(());
            }
            self.peer_mut(channel)?.peer_id = Some(id);
        }

        if let Some(mode) = info.mode {
            self.peer_mut(channel)?.mode = mode.into();
        }

        Ok(())
    }

    async fn ask_to_socialize(&mut self, channel: ChannelId) -> ProtocolResult<()> {
        let (offer, acceptor) = self.transport.originate().await?;
        self.answer_socialize.replace(acceptor, Instant::now());
        debug!("{} asking {} for an introduction", self.label(), channel);
        self.send_to(channel, &Message::AskToSocialize { offer })
    }

    pub(crate) fn on_ask_to_socialize(&mut self, channel: ChannelId, offer: String) -> ProtocolResult<()> {
        let requester = self.peer(channel)?.peer_id.ok_or(ProtocolError::UnknownPeer)?;

        let candidates = self
            .peers
            .filter(|p| p.channel_id() != channel && p.mode.is_public());
        let Some(target) = least_connected(&candidates) else {
            debug!("{} has nobody to introduce {} to", self.label(), requester);
            return Ok(());
        };

        debug!("{} introducing {} to {}", self.label(), requester, target.label());
        target.send(&Message::Socialize {
            offer,
            peer_id: requester,
        })?;
        Ok(())
    }

    pub(crate) async fn on_socialize(
        &mut self,
        channel: ChannelId,
        offer: String,
        requester: PeerId,
    ) -> ProtocolResult<()> {
        if !self.mode.is_public() {
            debug!("{} is hidden, ignoring introduction", self.label());
            return Ok(());
        }
        if self.peers.contains_id(requester) {
            debug!("{} already connected to {}", self.label(), requester);
            return Ok(());
        }

        let answer = self.transport.accept(&offer).await?;
        self.send_to(
            channel,
            &Message::SocializeBack {
                answer,
                peer_id: requester,
            },
        )
    }

    pub(crate) fn on_socialize_back(&mut self, answer: String, requester: PeerId) -> ProtocolResult<()> {
        let peer = self
            .peers
            .find_by_id(requester)
            .ok_or(ProtocolError::UnknownPeer)?;
        peer.send(&Message::Connect { answer })?;
        Ok(())
    }

    pub(crate) fn on_connect(&mut self, answer: String) -> ProtocolResult<()> {
        if !self.answer_socialize.complete(&answer, Instant::now())? {
            debug!("{} has no introduction pending", self.label());
        }
        Ok(())
    }
}

// Uniform pick among the neighbors sharing the lowest contact count.
fn least_connected<'a>(candidates: &[&'a Peer]) -> Option<&'a Peer> {
    let level = candidates.iter().map(|p| p.degree()).min()?;
    let lowest: Vec<&Peer> = candidates
        .iter()
        .copied()
        .filter(|p| p.degree() == level)
        .collect();
    lowest.choose(&mut rand::thread_rng()).copied()
}
