//! Length-prefixed framing.
//!
//! Each frame is a 4-byte big-endian length field followed by exactly
//! that many bytes of UTF-8 JSON. The length ceiling guards against
//! pathological allocation from a malformed or hostile prefix; a declared
//! length above the ceiling is a protocol violation that terminates the
//! connection. The async read side lives with the connection code; this
//! module owns the pure byte-level pieces so they stay testable without
//! I/O.

use crate::envelope::PacketEnvelope;
use crate::error::ProtocolError;

/// Default ceiling for a single frame body (16 MB). Status reports with
/// full player and plugin lists are the largest expected messages;
/// anything near this limit is pathological.
pub const DEFAULT_MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

/// Prepend the length prefix to an encoded frame body.
pub fn encode_frame(body: &[u8], max_frame_bytes: u32) -> Result<Vec<u8>, ProtocolError> {
    if body.len() > max_frame_bytes as usize {
        return Err(ProtocolError::FrameTooLarge {
            length: body.len(),
            limit: max_frame_bytes,
        });
    }
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(body);
    Ok(frame)
}

/// Serialize an envelope and wrap it in a frame in one step.
pub fn encode_packet(
    envelope: &PacketEnvelope,
    max_frame_bytes: u32,
) -> Result<Vec<u8>, ProtocolError> {
    encode_frame(&envelope.encode()?, max_frame_bytes)
}

/// Validate a length prefix against the ceiling and return the body length.
pub fn frame_len(header: [u8; 4], max_frame_bytes: u32) -> Result<usize, ProtocolError> {
    let declared = u32::from_be_bytes(header);
    if declared > max_frame_bytes {
        return Err(ProtocolError::FrameTooLarge {
            length: declared as usize,
            limit: max_frame_bytes,
        });
    }
    Ok(declared as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketType;

    #[test]
    fn frame_carries_length_prefix() {
        let frame = encode_frame(b"hello", DEFAULT_MAX_FRAME_BYTES).unwrap();
        assert_eq!(&frame[..4], &5u32.to_be_bytes());
        assert_eq!(&frame[4..], b"hello");
    }

    #[test]
    fn empty_body_is_a_valid_frame() {
        let frame = encode_frame(b"", DEFAULT_MAX_FRAME_BYTES).unwrap();
        assert_eq!(frame, vec![0, 0, 0, 0]);
    }

    #[test]
    fn oversize_body_is_rejected_on_encode() {
        let err = encode_frame(&[0u8; 9], 8).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { length: 9, limit: 8 }));
        assert!(err.is_fatal());
    }

    #[test]
    fn oversize_declared_length_is_rejected() {
        let header = (DEFAULT_MAX_FRAME_BYTES + 1).to_be_bytes();
        let err = frame_len(header, DEFAULT_MAX_FRAME_BYTES).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn declared_length_within_ceiling_passes() {
        assert_eq!(frame_len(17u32.to_be_bytes(), 1024).unwrap(), 17);
    }

    #[test]
    fn packet_round_trip_through_frame() {
        let envelope = PacketEnvelope::new(PacketType::ServerHeartbeat);
        let frame = encode_packet(&envelope, DEFAULT_MAX_FRAME_BYTES).unwrap();

        let body_len = frame_len(frame[..4].try_into().unwrap(), DEFAULT_MAX_FRAME_BYTES).unwrap();
        assert_eq!(body_len, frame.len() - 4);
        let decoded = PacketEnvelope::decode(&frame[4..]).unwrap();
        assert_eq!(decoded, envelope);
    }
}
