//! Wire protocol error types.

use thiserror::Error;

/// Wire protocol errors
#[derive(Error, Debug)]
pub enum WireError {
    /// Payload is not a JSON object
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// Envelope is not a JSON object
    #[error("envelope is not an object")]
    NotAnObject,

    /// Envelope has no integer `type` tag
    #[error("missing type tag")]
    MissingType,

    /// Unknown message type
    #[error("unknown type {0}")]
    UnknownType(u64),

    /// Required field missing or of the wrong JSON type
    #[error("field `{field}` must be {expected}")]
    Field {
        /// Field name as it appears on the wire
        field: &'static str,
        /// Human readable description of the expected type
        expected: &'static str,
    },
}

impl WireError {
    pub(crate) fn field(field: &'static str, expected: &'static str) -> Self {
        WireError::Field { field, expected }
    }
}
