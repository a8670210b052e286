//! Gateway configuration types and defaults.

use gateway_protocol::DEFAULT_MAX_FRAME_BYTES;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the connection gateway.
///
/// Contains the parameters that shape network behavior: bind address,
/// connection limits, idle policy and the frame size ceiling. The idle
/// timeout is deployment policy, not a protocol invariant; peers that
/// heartbeat regularly never hit it.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// The socket address to bind the gateway to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Close a connection after this long without inbound traffic
    pub idle_timeout: Duration,

    /// Ceiling for a single frame body; a declared length above this is a
    /// protocol violation fatal to the connection
    pub max_frame_bytes: u32,

    /// Whether to use SO_REUSEPORT for multi-threaded accept loops
    pub use_reuse_port: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081"
                .parse()
                .expect("default bind address must parse"),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            use_reuse_port: false,
        }
    }
}
