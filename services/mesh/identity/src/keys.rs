//! Ed25519 keypairs and hex encoded signatures.

use crate::{from_hex, to_hex, IdentityError};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::fmt;

/// Length of an exported public key in hex characters
pub const PUBLIC_KEY_HEX_LEN: usize = 64;

/// Signing keypair shared by the hidden parties of a rendezvous
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
    public_hex: String,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS random source
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Rebuild a keypair from its 32 byte secret
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(secret))
    }

    fn from_signing_key(signing: SigningKey) -> Self {
        let public_hex = to_hex(signing.verifying_key().as_bytes());
        Self {
            signing,
            public_hex,
        }
    }

    /// Exported public key, lowercase hex
    pub fn public_key_hex(&self) -> &str {
        &self.public_hex
    }

    /// Sign a message, returning the hex encoded signature
    pub fn sign(&self, message: &[u8]) -> String {
        to_hex(&self.signing.sign(message).to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_hex)
            .finish_non_exhaustive()
    }
}

/// Whether `text` has the shape of an exported public key
pub fn is_public_key_hex(text: &str) -> bool {
    text.len() == PUBLIC_KEY_HEX_LEN && text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Verify a hex signature over `message` against a hex public key
pub fn verify(public_key_hex: &str, message: &[u8], signature_hex: &str) -> Result<(), IdentityError> {
    let key_bytes = from_hex(public_key_hex)?;
    let key_bytes: [u8; 32] = key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| IdentityError::KeyLength(key_bytes.len()))?;
    let key = VerifyingKey::from_bytes(&key_bytes).map_err(|_| IdentityError::BadKey)?;

    let sig_bytes = from_hex(signature_hex)?;
    let sig_bytes: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| IdentityError::SignatureLength(sig_bytes.len()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    key.verify(message, &signature)
        .map_err(|_| IdentityError::BadSignature)
}
