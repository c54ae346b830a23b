//! Typed protocol messages and the JSON envelope codec for mesh peers.
//!
//! Peers exchange flat JSON objects over reliable, ordered channels. Each
//! object carries an integer `type` tag and the fields of one message kind.
//!
//! ## Message Types
//!
//! ```text
//! +-----+------------------+----------------------------------------------+
//! | tag | name             | fields                                       |
//! +-----+------------------+----------------------------------------------+
//! |  0  | INFO             | num?, name?, id?, mode?                      |
//! |  1  | ASK_TO_SOCIALIZE | offer                                        |
//! |  2  | SOCIALIZE        | offer, peerId                                |
//! |  3  | SOCIALIZE_BACK   | answer, peerId                               |
//! |  4  | CONNECT          | answer                                       |
//! |  5  | ASK_AROUND       | offer, path, signature, publicKey            |
//! |  6  | BACKTRACK        | answer, originator, signature, publicKey, path|
//! +-----+------------------+----------------------------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod message;

// Re-export main types
pub use codec::{decode, encode, get_str, get_u32, FieldsBuilder};
pub use error::WireError;
pub use message::{
    signed_payload, AnnouncedMode, AskAround, Backtrack, Info, Message, MessageType, PeerId,
};
