//! Protocol message structures exchanged between directly connected peers.

use mesh_identity::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Random 32-bit identifier a node picks for itself at startup
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PeerId {
    fn from(id: u32) -> Self {
        PeerId(id)
    }
}

/// Integer tag carried in the `type` field of every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Incremental peer attribute announcement
    Info = 0,
    /// Ask a well connected contact to introduce us to a mutual
    AskToSocialize = 1,
    /// Introduction forwarded to the least connected contact
    Socialize = 2,
    /// Answer to an introduction, sent back to the intermediary
    SocializeBack = 3,
    /// Answer delivered to the original requester
    Connect = 4,
    /// Signed flood search for holders of a key
    AskAround = 5,
    /// Signed answer walking back along the search path
    Backtrack = 6,
}

impl MessageType {
    /// Wire value of this tag
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u64> for MessageType {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::Info),
            1 => Ok(MessageType::AskToSocialize),
            2 => Ok(MessageType::Socialize),
            3 => Ok(MessageType::SocializeBack),
            4 => Ok(MessageType::Connect),
            5 => Ok(MessageType::AskAround),
            6 => Ok(MessageType::Backtrack),
            other => Err(other),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Info => "INFO",
            MessageType::AskToSocialize => "ASK_TO_SOCIALIZE",
            MessageType::Socialize => "SOCIALIZE",
            MessageType::SocializeBack => "SOCIALIZE_BACK",
            MessageType::Connect => "CONNECT",
            MessageType::AskAround => "ASK_AROUND",
            MessageType::Backtrack => "BACKTRACK",
        };
        f.write_str(name)
    }
}

/// Mode a peer announces about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncedMode {
    /// Peer relays discovery traffic openly
    Public,
    /// Peer is hidden behind the given hex encoded public key
    Hidden(String),
}

impl From<&Mode> for AnnouncedMode {
    fn from(mode: &Mode) -> Self {
        match mode {
            Mode::Public => AnnouncedMode::Public,
            Mode::Hidden(keys) => AnnouncedMode::Hidden(keys.public_key_hex().to_string()),
        }
    }
}

/// INFO payload. Every field is optional and applied independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info {
    /// Sender's current number of contacts
    pub num: Option<u32>,
    /// Sender's debug label
    pub name: Option<String>,
    /// Sender's peer id
    pub id: Option<PeerId>,
    /// Sender's mode
    pub mode: Option<AnnouncedMode>,
}

impl Info {
    /// Contact count broadcast
    pub fn contacts(num: u32) -> Self {
        Self {
            num: Some(num),
            ..Self::default()
        }
    }

    /// Self announcement sent to a freshly opened channel
    pub fn announce(name: Option<String>, id: PeerId, mode: AnnouncedMode) -> Self {
        Self {
            num: None,
            name,
            id: Some(id),
            mode: Some(mode),
        }
    }
}

/// ASK_AROUND payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskAround {
    /// Searcher's session description
    pub offer: String,
    /// Relays traversed so far, originator first
    pub path: Vec<PeerId>,
    /// Hex signature over `originator + offer`
    pub signature: String,
    /// Hex public key shared by the searching parties
    pub public_key: String,
}

impl AskAround {
    /// Original searcher, i.e. the first path entry
    pub fn originator(&self) -> Option<PeerId> {
        self.path.first().copied()
    }

    /// Dedup token and signed payload of this search
    pub fn identifier(&self) -> Option<String> {
        self.originator()
            .map(|originator| signed_payload(originator, &self.offer))
    }
}

/// BACKTRACK payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backtrack {
    /// Target's session description answering the search offer
    pub answer: String,
    /// Peer id of the node that produced the answer
    pub originator: PeerId,
    /// Hex signature over `originator + answer`
    pub signature: String,
    /// Hex public key shared by the searching parties
    pub public_key: String,
    /// Remaining hops back to the searcher
    pub path: Vec<PeerId>,
}

impl Backtrack {
    /// Signed payload of this answer
    pub fn identifier(&self) -> String {
        signed_payload(self.originator, &self.answer)
    }
}

/// A decoded protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Peer attribute announcement
    Info(Info),
    /// Request an introduction
    AskToSocialize {
        /// Requester's session description
        offer: String,
    },
    /// Forwarded introduction
    Socialize {
        /// Requester's session description
        offer: String,
        /// Requester's peer id
        peer_id: PeerId,
    },
    /// Introduction answer on its way back to the intermediary
    SocializeBack {
        /// Candidate's session description
        answer: String,
        /// Requester's peer id
        peer_id: PeerId,
    },
    /// Introduction answer for the requester
    Connect {
        /// Candidate's session description
        answer: String,
    },
    /// Flood search
    AskAround(AskAround),
    /// Search answer
    Backtrack(Backtrack),
}

impl Message {
    /// Tag of this message
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Info(_) => MessageType::Info,
            Message::AskToSocialize { .. } => MessageType::AskToSocialize,
            Message::Socialize { .. } => MessageType::Socialize,
            Message::SocializeBack { .. } => MessageType::SocializeBack,
            Message::Connect { .. } => MessageType::Connect,
            Message::AskAround(_) => MessageType::AskAround,
            Message::Backtrack(_) => MessageType::Backtrack,
        }
    }
}

/// Bytes covered by rendezvous signatures: the decimal peer id followed by the description
pub fn signed_payload(id: PeerId, description: &str) -> String {
    format!("{}{}", id, description)
}
