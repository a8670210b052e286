//! Protocol error taxonomy.
//!
//! Two classes of failure exist on the wire. Framing violations (a length
//! prefix above the configured ceiling, or a stream that ends mid-frame)
//! mean the byte stream can no longer be trusted and the connection must
//! close. Everything else (malformed JSON, a missing or unknown `type`
//! code) is scoped to the single message that carried it.

use thiserror::Error;

/// Errors produced while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A frame's declared or actual length exceeds the configured ceiling.
    /// Fatal: the peer is either broken or hostile.
    #[error("frame of {length} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { length: usize, limit: u32 },

    /// The stream ended in the middle of a length prefix or frame body.
    /// Fatal: resynchronizing a length-prefixed stream is not possible.
    #[error("frame truncated: {0}")]
    TruncatedFrame(String),

    /// The frame body is valid JSON but not an object, or a payload could
    /// not be represented as a flat object.
    #[error("message body is not a JSON object")]
    NotAnObject,

    /// The message object has no integer `type` field.
    #[error("message is missing an integer `type` field")]
    MissingType,

    /// The `type` code does not resolve to a catalog entry.
    #[error("unknown packet type code: {0}")]
    UnknownType(u64),

    /// The frame body is not valid JSON, or a payload failed to
    /// (de)serialize.
    #[error("malformed message body: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Whether this error terminates the connection.
    ///
    /// Only transport-level framing violations are fatal; per-message
    /// decode failures leave the connection open.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::FrameTooLarge { .. } | ProtocolError::TruncatedFrame(_)
        )
    }
}
