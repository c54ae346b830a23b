//! Transport adapter seam.
//!
//! A transport turns an offer/answer pair of session descriptions into an
//! open, ordered, reliable text channel. Channel lifecycle is reported to the
//! owning node as [`TransportEvent`]s on its event queue.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Identifier of one end of a channel, unique within a node
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch-{}", self.0)
    }
}

/// Transport errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Offer was never issued or has already been accepted
    #[error("unknown offer")]
    UnknownOffer,
    /// Answer was never issued or has already been used
    #[error("unknown answer")]
    UnknownAnswer,
    /// Answer belongs to a different offer
    #[error("answer does not match offer")]
    AnswerMismatch,
    /// Channel has been closed
    #[error("channel closed")]
    ChannelClosed,
    /// The node on the other side is gone
    #[error("remote node unreachable")]
    NetworkGone,
}

/// One open, ordered, reliable text channel to a direct neighbor
pub trait Channel: Send + Sync + fmt::Debug {
    /// Local identifier of this channel end
    fn id(&self) -> ChannelId;
    /// Send one text message
    fn send(&self, text: String) -> Result<(), TransportError>;
    /// Close the channel on both ends
    fn close(&self);
}

/// One-shot continuation that completes an originated connection
pub trait AnswerAcceptor: Send + fmt::Debug {
    /// Hand the remote answer to the transport
    fn accept_answer(self: Box<Self>, answer: &str) -> Result<(), TransportError>;
}

/// Offer/answer connection establishment
#[async_trait]
pub trait Transport: Send + Sync {
    /// Produce a local offer and the continuation that later consumes the answer
    async fn originate(&self) -> Result<(String, Box<dyn AnswerAcceptor>), TransportError>;

    /// Answer a remote offer
    async fn accept(&self, offer: &str) -> Result<String, TransportError>;
}

/// Channel lifecycle events delivered to a node
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A channel finished negotiation and is ready
    Opened(Arc<dyn Channel>),
    /// Text arrived on a channel
    Message {
        /// Receiving channel
        channel: ChannelId,
        /// Raw envelope text
        text: String,
    },
    /// A channel closed
    Closed {
        /// Closed channel
        channel: ChannelId,
    },
}

/// Sender half of a node's event queue
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiver half of a node's event queue
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Run a full offer/answer exchange from `initiator` to `responder`.
///
/// This is the out-of-band signalling a bootstrap server performs: both
/// sides learn about the new channel through their own `Opened` events.
pub async fn connect(initiator: &dyn Transport, responder: &dyn Transport) -> Result<(), TransportError> {
    let (offer, acceptor) = initiator.originate().await?;
    let answer = responder.accept(&offer).await?;
    acceptor.accept_answer(&answer)
}
