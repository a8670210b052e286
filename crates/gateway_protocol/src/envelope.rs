//! Packet envelope: the common header wrapping every wire message.
//!
//! On the wire the envelope and its type-specific payload are one flat
//! JSON object: `type`, `timestamp` and (optionally) `token` sit beside
//! the payload fields rather than nesting them. `token` is a credential
//! and must never appear in logs; session ids are the loggable surrogate.

use crate::error::ProtocolError;
use crate::packet::PacketType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as epoch milliseconds, the envelope timestamp unit.
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// The common header plus flattened payload of one wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketEnvelope {
    /// Packet type code from the closed catalog.
    #[serde(rename = "type")]
    pub packet_type: PacketType,

    /// Producer-side send time, epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,

    /// Credential / session identifier. Present on auth and admin
    /// packets. Never logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Type-specific payload fields, flattened into the same object.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl PacketEnvelope {
    /// Create an envelope of the given type, stamped with the current time.
    pub fn new(packet_type: PacketType) -> Self {
        Self {
            packet_type,
            timestamp: current_timestamp_millis(),
            token: None,
            payload: Map::new(),
        }
    }

    /// Attach a token to the envelope.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Merge a serializable payload's fields into the envelope.
    ///
    /// The payload must serialize to a JSON object; anything else cannot
    /// be flattened into the wire format.
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Result<Self, ProtocolError> {
        match serde_json::to_value(payload)? {
            Value::Object(map) => {
                self.payload = map;
                Ok(self)
            }
            _ => Err(ProtocolError::NotAnObject),
        }
    }

    /// Parse the flattened payload fields into a typed structure.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(Value::Object(self.payload.clone())).map_err(Into::into)
    }

    /// Serialize the envelope to its JSON wire body (without framing).
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(Into::into)
    }

    /// Decode a frame body into an envelope.
    ///
    /// Distinguishes the recoverable failure modes the dispatch loop cares
    /// about: a body that is not a JSON object, a missing or non-integer
    /// `type` field, and a `type` code outside the catalog. All of these
    /// drop the single message without closing the connection.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;

        let code = object
            .get("type")
            .and_then(Value::as_u64)
            .ok_or(ProtocolError::MissingType)?;
        if u16::try_from(code)
            .ok()
            .and_then(PacketType::from_code)
            .is_none()
        {
            return Err(ProtocolError::UnknownType(code));
        }

        serde_json::from_value(value).map_err(Into::into)
    }
}
