//! Rendezvous: signed flood search and backtracking.
//!
//! A hidden node floods ASK_AROUND through public relays. Each relay appends
//! itself to the search path after cutting it back to the earliest entry it is
//! directly connected to. The hidden holder of the same key answers with a
//! signed BACKTRACK that walks the path in reverse, one popped id per hop.
//!
//! Signatures cover `originator + offer` and `originator + answer` only. The
//! path itself is unauthenticated, so a misbehaving relay can misroute an
//! answer but cannot forge one.

use crate::error::{ProtocolError, ProtocolResult};
use crate::node::Node;
use mesh_identity::verify;
use mesh_session::ChannelId;
use mesh_storage::SeenStore;
use mesh_wire::{signed_payload, AskAround, Backtrack, Message, PeerId};
use tokio::time::Instant;
use tracing::{debug, info, trace};

/// Cut `path` after its first entry accepted by `is_contact` and append `own`
pub fn compress_path<F>(path: &[PeerId], is_contact: F, own: PeerId) -> Vec<PeerId>
where
    F: Fn(PeerId) -> bool,
{
    let keep = path
        .iter()
        .position(|id| is_contact(*id))
        .map_or(path.len(), |index| index + 1);

    let mut compressed = Vec::with_capacity(keep + 1);
    compressed.extend_from_slice(&path[..keep]);
    compressed.push(own);
    compressed
}

impl Node {
    fn check_key(&self, public_key: &str) -> ProtocolResult<()> {
        match self.mode.public_key_hex() {
            Some(own) if own != public_key => Err(ProtocolError::KeyMismatch),
            _ => Ok(()),
        }
    }

    pub(crate) async fn on_ask_around(&mut self, channel: ChannelId, ask: AskAround) -> ProtocolResult<()> {
        self.check_key(&ask.public_key)?;

        let originator = ask.originator().ok_or(ProtocolError::EmptyPath)?;
        let identifier = signed_payload(originator, &ask.offer);
        if !self.seen.check_and_mark(&identifier, Instant::now().into_std()) {
            trace!("{} already saw search from {}", self.label(), originator);
            return Ok(());
        }

        verify(&ask.public_key, identifier.as_bytes(), &ask.signature)?;

        if self.mode.is_public() {
            self.relay_search(ask, originator)
        } else {
            self.answer_search(channel, ask).await
        }
    }

    fn relay_search(&mut self, mut ask: AskAround, originator: PeerId) -> ProtocolResult<()> {
        let target = self
            .peers
            .iter()
            .find(|p| p.mode.is_hidden_as(&ask.public_key) && p.peer_id != Some(originator));
        if let Some(target) = target {
            debug!("{} handing search from {} to {}", self.label(), originator, target.label());
            target.send(&Message::AskAround(ask))?;
            return Ok(());
        }

        let peers = &self.peers;
        ask.path = compress_path(&ask.path, |id| peers.contains_id(id), self.peer_id);
        let sent = self.peers.broadcast(&Message::AskAround(ask));
        trace!("{} flooded search from {} to {} peers", self.label(), originator, sent);
        Ok(())
    }

    async fn answer_search(&mut self, channel: ChannelId, ask: AskAround) -> ProtocolResult<()> {
        let Some(key_pair) = self.mode.key_pair().cloned() else {
            return Err(ProtocolError::KeyMismatch);
        };

        let answer = self.transport.accept(&ask.offer).await?;
        let signature = key_pair.sign(signed_payload(self.peer_id, &answer).as_bytes());

        debug!("{} answering search from {:?}", self.label(), ask.originator());
        let back = Backtrack {
            answer,
            originator: self.peer_id,
            signature,
            public_key: key_pair.public_key_hex().to_string(),
            path: ask.path,
        };
        self.send_to(channel, &Message::Backtrack(back))
    }

    pub(crate) fn on_backtrack(&mut self, channel: ChannelId, mut back: Backtrack) -> ProtocolResult<()> {
        self.check_key(&back.public_key)?;
        verify(&back.public_key, back.identifier().as_bytes(), &back.signature)?;

        if self.mode.is_public() {
            let next_id = back.path.pop().ok_or(ProtocolError::EmptyPath)?;
            let next = self
                .peers
                .find_by_id(next_id)
                .ok_or(ProtocolError::StaleRoute(next_id))?;

            let from = self.peer(channel).map(|p| p.label()).unwrap_or_default();
            debug!(
                path = ?back.path,
                "Backtracking through {} -> {} -> {}",
                from,
                self.label(),
                next.label()
            );
            next.send(&Message::Backtrack(back))?;
            return Ok(());
        }

        if self.peers.contains_id(back.originator) {
            debug!("{} already connected to {}", self.label(), back.originator);
            self.final_connect.clear();
            return Ok(());
        }

        if self.final_connect.complete(&back.answer, Instant::now())? {
            info!("{} found {} via rendezvous", self.label(), back.originator);
            self.record_rendezvous();
        } else {
            debug!("{} has no search pending", self.label());
        }
        Ok(())
    }
}
