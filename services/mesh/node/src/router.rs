//! Message router: decode an envelope and hand it to the matching handler.

use crate::node::Node;
use mesh_session::ChannelId;
use mesh_wire::{decode, Message, WireError};
use tracing::{debug, trace};

impl Node {
    /// Decode `text` received on `channel` and run its handler.
    ///
    /// Malformed input, unknown tags and handler failures only drop the
    /// message; nothing here is fatal to the node.
    pub async fn dispatch(&mut self, channel: ChannelId, text: &str) {
        if self.peers.get(channel).is_none() {
            trace!("Ignoring message on closed channel {}", channel);
            return;
        }

        let message = match decode(text) {
            Ok(message) => message,
            Err(WireError::UnknownType(tag)) => {
                trace!("Ignoring message with unknown type {} on {}", tag, channel);
                return;
            }
            Err(e) => {
                debug!("Dropping malformed message on {}: {}", channel, e);
                return;
            }
        };

        let kind = message.message_type();
        trace!("{} received {} on {}", self.label(), kind, channel);

        let result = match message {
            Message::Info(info) => self.on_info(channel, info).await,
            Message::AskToSocialize { offer } => self.on_ask_to_socialize(channel, offer),
            Message::Socialize { offer, peer_id } => self.on_socialize(channel, offer, peer_id).await,
            Message::SocializeBack { answer, peer_id } => self.on_socialize_back(answer, peer_id),
            Message::Connect { answer } => self.on_connect(answer),
            Message::AskAround(ask) => self.on_ask_around(channel, ask).await,
            Message::Backtrack(back) => self.on_backtrack(channel, back),
        };

        if let Err(e) = result {
            debug!("{} dropped {} from {}: {}", self.label(), kind, channel, e);
        }
    }
}
