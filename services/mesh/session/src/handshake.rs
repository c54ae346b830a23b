//! Pending handshake slots.
//!
//! A node keeps at most one outstanding originated connection per handshake
//! kind. The slot holds the transport continuation that consumes the answer
//! once it arrives. A slot older than its timeout counts as empty, so a
//! handshake whose reply path broke does not block the next attempt forever.

use crate::transport::{AnswerAcceptor, TransportError};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default time to wait for an answer
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

struct Pending {
    acceptor: Box<dyn AnswerAcceptor>,
    started: Instant,
}

/// Optional one-shot continuation with replace/clear operations
pub struct PendingHandshake {
    kind: &'static str,
    slot: Option<Pending>,
    timeout: Duration,
}

impl PendingHandshake {
    /// Empty slot for the named handshake kind
    pub fn new(kind: &'static str, timeout: Duration) -> Self {
        Self {
            kind,
            slot: None,
            timeout,
        }
    }

    /// Whether a live handshake occupies the slot
    pub fn is_pending(&mut self, now: Instant) -> bool {
        self.expire(now);
        self.slot.is_some()
    }

    /// Store a continuation, discarding any previous one
    pub fn replace(&mut self, acceptor: Box<dyn AnswerAcceptor>, now: Instant) {
        if self.slot.is_some() {
            debug!("Replacing pending {} handshake", self.kind);
        }
        self.slot = Some(Pending {
            acceptor,
            started: now,
        });
    }

    /// Remove and return the live continuation, if any
    pub fn take(&mut self, now: Instant) -> Option<Box<dyn AnswerAcceptor>> {
        self.expire(now);
        self.slot.take().map(|pending| pending.acceptor)
    }

    /// Hand `answer` to the live continuation and clear the slot.
    /// Returns false if nothing was pending.
    pub fn complete(&mut self, answer: &str, now: Instant) -> Result<bool, TransportError> {
        match self.take(now) {
            Some(acceptor) => {
                acceptor.accept_answer(answer)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop the continuation without completing it
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Clear the slot if its handshake timed out. Returns true if it did.
    pub fn expire(&mut self, now: Instant) -> bool {
        let expired = self
            .slot
            .as_ref()
            .map(|pending| now.saturating_duration_since(pending.started) >= self.timeout)
            .unwrap_or(false);
        if expired {
            debug!(
                "Pending {} handshake timed out after {:?}",
                self.kind, self.timeout
            );
            self.slot = None;
        }
        expired
    }
}

impl fmt::Debug for PendingHandshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingHandshake")
            .field("kind", &self.kind)
            .field("pending", &self.slot.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
