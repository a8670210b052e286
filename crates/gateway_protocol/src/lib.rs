//! # Gateway Wire Protocol
//!
//! Framing and envelope (de)serialization for the connection gateway.
//! Every message exchanged with a game-server process is a 4-byte
//! big-endian length prefix followed by a flat UTF-8 JSON object that
//! merges the envelope fields (`type`, `timestamp`, optional `token`)
//! with the type-specific payload fields.
//!
//! The packet type catalog is a closed, append-only table of integer
//! codes grouped into semantic bands. Codes are stable wire identifiers:
//! new types append new codes, existing codes are never reused or
//! renumbered.
//!
//! Error classification matters here: transport-level framing violations
//! (oversize or truncated frames) are fatal to the connection, while a
//! well-framed message with a malformed body or an unknown type code is
//! dropped without affecting the connection. See [`ProtocolError::is_fatal`].

pub mod envelope;
pub mod error;
pub mod framing;
pub mod messages;
pub mod packet;

pub use envelope::{current_timestamp_millis, PacketEnvelope};
pub use error::ProtocolError;
pub use framing::{encode_frame, encode_packet, frame_len, DEFAULT_MAX_FRAME_BYTES};
pub use packet::PacketType;
