//! Encoding and decoding for the JSON envelope.
//!
//! Every message is a flat JSON object carrying an integer `type` tag plus the
//! fields of that message kind. Decoding validates the shape of every required
//! field before a typed [`Message`] is handed to a dispatcher.

use crate::error::WireError;
use crate::message::{AnnouncedMode, AskAround, Backtrack, Info, Message, MessageType, PeerId};
use mesh_identity::is_public_key_hex;
use serde_json::{Map, Value};

/// Envelope builder helper
#[derive(Debug, Clone)]
pub struct FieldsBuilder {
    map: Map<String, Value>,
}

impl FieldsBuilder {
    /// Start an envelope for the given message type
    pub fn new(typ: MessageType) -> Self {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::from(typ.as_u8()));
        Self { map }
    }

    /// Insert a string value
    pub fn insert_str(mut self, key: &str, value: &str) -> Self {
        self.map
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Insert a u32 value
    pub fn insert_u32(mut self, key: &str, value: u32) -> Self {
        self.map.insert(key.to_string(), Value::from(value));
        self
    }

    /// Insert a boolean value
    pub fn insert_bool(mut self, key: &str, value: bool) -> Self {
        self.map.insert(key.to_string(), Value::Bool(value));
        self
    }

    /// Insert a path of peer ids
    pub fn insert_path(mut self, key: &str, path: &[PeerId]) -> Self {
        let ids = path.iter().map(|id| Value::from(id.0)).collect();
        self.map.insert(key.to_string(), Value::Array(ids));
        self
    }

    /// Build the envelope text
    pub fn build(self) -> String {
        Value::Object(self.map).to_string()
    }
}

/// Encode a message into its envelope text
pub fn encode(message: &Message) -> String {
    let builder = FieldsBuilder::new(message.message_type());
    match message {
        Message::Info(info) => {
            let mut builder = builder;
            if let Some(num) = info.num {
                builder = builder.insert_u32("num", num);
            }
            if let Some(name) = &info.name {
                builder = builder.insert_str("name", name);
            }
            if let Some(id) = info.id {
                builder = builder.insert_u32("id", id.0);
            }
            match &info.mode {
                Some(AnnouncedMode::Public) => builder = builder.insert_bool("mode", true),
                Some(AnnouncedMode::Hidden(key)) => builder = builder.insert_str("mode", key),
                None => {}
            }
            builder.build()
        }
        Message::AskToSocialize { offer } => builder.insert_str("offer", offer).build(),
        Message::Socialize { offer, peer_id } => builder
            .insert_str("offer", offer)
            .insert_u32("peerId", peer_id.0)
            .build(),
        Message::SocializeBack { answer, peer_id } => builder
            .insert_str("answer", answer)
            .insert_u32("peerId", peer_id.0)
            .build(),
        Message::Connect { answer } => builder.insert_str("answer", answer).build(),
        Message::AskAround(ask) => builder
            .insert_str("offer", &ask.offer)
            .insert_path("path", &ask.path)
            .insert_str("signature", &ask.signature)
            .insert_str("publicKey", &ask.public_key)
            .build(),
        Message::Backtrack(back) => builder
            .insert_str("answer", &back.answer)
            .insert_u32("originator", back.originator.0)
            .insert_str("signature", &back.signature)
            .insert_str("publicKey", &back.public_key)
            .insert_path("path", &back.path)
            .build(),
    }
}

/// Decode and validate an envelope
pub fn decode(text: &str) -> Result<Message, WireError> {
    let value: Value = serde_json::from_str(text)?;
    let fields = match value {
        Value::Object(map) => map,
        _ => return Err(WireError::NotAnObject),
    };

    let tag = fields
        .get("type")
        .and_then(Value::as_u64)
        .ok_or(WireError::MissingType)?;
    let typ = MessageType::try_from(tag).map_err(WireError::UnknownType)?;

    let message = match typ {
        MessageType::Info => Message::Info(decode_info(&fields)),
        MessageType::AskToSocialize => Message::AskToSocialize {
            offer: require_str(&fields, "offer")?,
        },
        MessageType::Socialize => Message::Socialize {
            offer: require_str(&fields, "offer")?,
            peer_id: require_peer_id(&fields, "peerId")?,
        },
        MessageType::SocializeBack => Message::SocializeBack {
            answer: require_str(&fields, "answer")?,
            peer_id: require_peer_id(&fields, "peerId")?,
        },
        MessageType::Connect => Message::Connect {
            answer: require_str(&fields, "answer")?,
        },
        MessageType::AskAround => Message::AskAround(AskAround {
            signature: require_str(&fields, "signature")?,
            public_key: require_str(&fields, "publicKey")?,
            offer: require_str(&fields, "offer")?,
            path: require_path(&fields, "path")?,
        }),
        MessageType::Backtrack => Message::Backtrack(Backtrack {
            signature: require_str(&fields, "signature")?,
            public_key: require_str(&fields, "publicKey")?,
            answer: require_str(&fields, "answer")?,
            originator: require_peer_id(&fields, "originator")?,
            path: require_path(&fields, "path")?,
        }),
    };

    Ok(message)
}

// INFO is lenient: a field of the wrong type is skipped, not fatal. A hidden
// mode must carry an exported public key.
fn decode_info(fields: &Map<String, Value>) -> Info {
    let mode = match fields.get("mode") {
        Some(Value::Bool(true)) => Some(AnnouncedMode::Public),
        Some(Value::String(key)) if is_public_key_hex(key) => Some(AnnouncedMode::Hidden(key.clone())),
        _ => None,
    };

    Info {
        num: get_u32(fields, "num"),
        name: get_str(fields, "name"),
        id: get_u32(fields, "id").map(PeerId),
        mode,
    }
}

/// Get string value from an envelope
pub fn get_str(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(|v| v.as_str().map(str::to_string))
}

/// Get u32 value from an envelope
pub fn get_u32(fields: &Map<String, Value>, key: &str) -> Option<u32> {
    fields
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn require_str(fields: &Map<String, Value>, key: &'static str) -> Result<String, WireError> {
    get_str(fields, key).ok_or_else(|| WireError::field(key, "a string"))
}

fn require_peer_id(fields: &Map<String, Value>, key: &'static str) -> Result<PeerId, WireError> {
    get_u32(fields, key)
        .map(PeerId)
        .ok_or_else(|| WireError::field(key, "a 32-bit peer id"))
}

fn require_path(fields: &Map<String, Value>, key: &'static str) -> Result<Vec<PeerId>, WireError> {
    let invalid = || WireError::field(key, "an array of peer ids");
    let entries = fields.get(key).and_then(Value::as_array).ok_or_else(invalid)?;

    entries
        .iter()
        .map(|entry| {
            entry
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(PeerId)
                .ok_or_else(invalid)
        })
        .collect()
}
