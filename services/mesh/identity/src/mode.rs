//! Node participation mode.

use crate::KeyPair;

/// How a node takes part in discovery
#[derive(Debug, Clone, Default)]
pub enum Mode {
    /// Relays mesh growth and rendezvous traffic openly
    #[default]
    Public,
    /// Identified by a shared keypair, seeks the other holders of it
    Hidden(KeyPair),
}

impl Mode {
    /// Whether this node relays openly
    pub fn is_public(&self) -> bool {
        matches!(self, Mode::Public)
    }

    /// Shared keypair of a hidden node
    pub fn key_pair(&self) -> Option<&KeyPair> {
        match self {
            Mode::Public => None,
            Mode::Hidden(keys) => Some(keys),
        }
    }

    /// Exported public key of a hidden node
    pub fn public_key_hex(&self) -> Option<&str> {
        self.key_pair().map(KeyPair::public_key_hex)
    }
}
