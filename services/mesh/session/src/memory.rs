//! In-process transport.
//!
//! Offers and answers are opaque tokens kept in a registry shared by every
//! node of one [`MemoryNetwork`]. Completing an answer creates a connected
//! channel pair and reports it as opened to both nodes, mirroring how a real
//! transport finishes connectivity negotiation asynchronously.

use crate::transport::{
    AnswerAcceptor, Channel, ChannelId, EventReceiver, EventSender, Transport, TransportError,
    TransportEvent,
};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

#[derive(Debug)]
struct PendingAnswer {
    /// Offer this answer responds to
    offer: String,
    /// Event queue of the accepting node
    events: EventSender,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: AtomicU64,
    offers: DashSet<String>,
    answers: DashMap<String, PendingAnswer>,
}

/// Shared registry connecting the in-memory transports of many nodes
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<Registry>,
}

impl MemoryNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport bound to a fresh node event queue
    pub fn transport(&self) -> (MemoryTransport, EventReceiver) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = MemoryTransport {
            network: self.clone(),
            events,
        };
        (transport, rx)
    }

    /// Offers issued but not yet accepted
    pub fn pending_offers(&self) -> usize {
        self.inner.offers.len()
    }

    /// Answers issued but not yet delivered
    pub fn pending_answers(&self) -> usize {
        self.inner.answers.len()
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn open_pair(&self, originator: &EventSender, acceptor: &EventSender) -> Result<(), TransportError> {
        let closed = Arc::new(AtomicBool::new(false));
        let a = ChannelId(self.next_id());
        let b = ChannelId(self.next_id());

        let local = MemoryChannel {
            id: a,
            remote_id: b,
            local_events: originator.clone(),
            remote_events: acceptor.clone(),
            closed: closed.clone(),
        };
        let remote = MemoryChannel {
            id: b,
            remote_id: a,
            local_events: acceptor.clone(),
            remote_events: originator.clone(),
            closed,
        };

        debug!("Opening in-memory channel pair {} <-> {}", a, b);

        let opened_local = originator.send(TransportEvent::Opened(Arc::new(local)));
        let opened_remote = acceptor.send(TransportEvent::Opened(Arc::new(remote)));
        if opened_local.is_err() || opened_remote.is_err() {
            warn!("Channel pair {} <-> {} opened towards a stopped node", a, b);
            return Err(TransportError::NetworkGone);
        }
        Ok(())
    }
}

/// Transport handle owned by one node
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    network: MemoryNetwork,
    events: EventSender,
}

impl MemoryTransport {
    /// Network this transport belongs to
    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn originate(&self) -> Result<(String, Box<dyn AnswerAcceptor>), TransportError> {
        let offer = format!("mem-offer-{}", self.network.next_id());
        self.network.inner.offers.insert(offer.clone());
        trace!("Issued offer {}", offer);

        let acceptor = MemoryAnswerAcceptor {
            network: self.network.clone(),
            offer: offer.clone(),
            events: self.events.clone(),
        };
        Ok((offer, Box::new(acceptor)))
    }

    async fn accept(&self, offer: &str) -> Result<String, TransportError> {
        if self.network.inner.offers.remove(offer).is_none() {
            return Err(TransportError::UnknownOffer);
        }

        let answer = format!("mem-answer-{}", self.network.next_id());
        self.network.inner.answers.insert(
            answer.clone(),
            PendingAnswer {
                offer: offer.to_string(),
                events: self.events.clone(),
            },
        );
        trace!("Answered offer {} with {}", offer, answer);
        Ok(answer)
    }
}

/// Continuation returned by [`MemoryTransport::originate`]
#[derive(Debug)]
pub struct MemoryAnswerAcceptor {
    network: MemoryNetwork,
    offer: String,
    events: EventSender,
}

impl AnswerAcceptor for MemoryAnswerAcceptor {
    fn accept_answer(self: Box<Self>, answer: &str) -> Result<(), TransportError> {
        let answers = &self.network.inner.answers;
        match answers.remove_if(answer, |_, pending| pending.offer == self.offer) {
            Some((_, pending)) => self.network.open_pair(&self.events, &pending.events),
            None if answers.contains_key(answer) => Err(TransportError::AnswerMismatch),
            None => Err(TransportError::UnknownAnswer),
        }
    }
}

// Withdraw the offer and any answer issued for it.
impl Drop for MemoryAnswerAcceptor {
    fn drop(&mut self) {
        let registry = &self.network.inner;
        if registry.offers.remove(&self.offer).is_some() {
            trace!("Withdrew unanswered offer {}", self.offer);
        }
        registry.answers.retain(|_, pending| pending.offer != self.offer);
    }
}

/// One end of an in-memory channel pair
pub struct MemoryChannel {
    id: ChannelId,
    remote_id: ChannelId,
    local_events: EventSender,
    remote_events: EventSender,
    closed: Arc<AtomicBool>,
}

impl fmt::Debug for MemoryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryChannel")
            .field("id", &self.id)
            .field("remote_id", &self.remote_id)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl Channel for MemoryChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn send(&self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ChannelClosed);
        }
        self.remote_events
            .send(TransportEvent::Message {
                channel: self.remote_id,
                text,
            })
            .map_err(|_| TransportError::NetworkGone)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("Closing in-memory channel {}", self.id);
        let _ = self.local_events.send(TransportEvent::Closed { channel: self.id });
        let _ = self.remote_events.send(TransportEvent::Closed {
            channel: self.remote_id,
        });
    }
}
