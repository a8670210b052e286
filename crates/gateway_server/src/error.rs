//! Gateway error types.

use gateway_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the gateway, registry and relay.
///
/// Propagation is deliberately narrow: per-message failures are logged and
/// contained at the dispatch boundary, so most of these only travel within
/// a single connection's pipeline or up to the binary at startup.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Socket-level failures: bind, accept, read, write.
    #[error("network error: {0}")]
    Network(String),

    /// Wire protocol failures; fatality follows [`ProtocolError::is_fatal`].
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Login rejected: token empty, unresolvable, or disabled.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The target connection's write queue is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// Admin command with an invalid shape for its command type.
    #[error("invalid admin command: {0}")]
    InvalidCommand(String),

    /// Bus subscribe/publish failure.
    #[error("bus error: {0}")]
    Bus(String),

    /// Anything that should not happen; caught at the message boundary.
    #[error("internal error: {0}")]
    Internal(String),
}
