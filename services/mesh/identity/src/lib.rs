//! Node identity, hex helpers, and Ed25519 signing for mesh rendezvous.
//!
//! A node is either public, relaying discovery traffic for everyone, or hidden
//! behind an Ed25519 keypair it shares with the other parties it wants to meet.
//! Rendezvous messages are signed with that keypair so relays can check them
//! without being able to forge them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod keys;
pub mod mode;

use thiserror::Error;

pub use keys::{is_public_key_hex, verify, KeyPair, PUBLIC_KEY_HEX_LEN};
pub use mode::Mode;

/// Identity and signature errors
#[derive(Error, Debug, PartialEq)]
pub enum IdentityError {
    /// Input is not valid hex
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    /// Public key has the wrong length
    #[error("public key must be 32 bytes, got {0}")]
    KeyLength(usize),
    /// Signature has the wrong length
    #[error("signature must be 64 bytes, got {0}")]
    SignatureLength(usize),
    /// Public key bytes do not encode a curve point
    #[error("malformed public key")]
    BadKey,
    /// Signature does not verify
    #[error("signature verification failed")]
    BadSignature,
}

/// Lowercase hex encoding
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string
pub fn from_hex(text: &str) -> Result<Vec<u8>, IdentityError> {
    Ok(hex::decode(text)?)
}
