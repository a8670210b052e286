//! Packet dispatch: the handler table and the per-connection context
//! handlers operate on.
//!
//! Envelope `type` selects a handler by table lookup. The table is open
//! for extension (registering a new packet type never touches existing
//! handlers) and types with no registered handler are logged and dropped,
//! never treated as fatal.

use crate::auth::TokenValidator;
use crate::bus::MessageBus;
use crate::connection::ConnectionHandle;
use crate::error::GatewayError;
use crate::gateway::GatewayContext;
use crate::registry::SessionRegistry;
use crate::session::ServerSession;
use async_trait::async_trait;
use dashmap::DashMap;
use gateway_protocol::{encode_packet, PacketEnvelope, PacketType};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

mod chat;
mod heartbeat;
mod login;
mod status;

pub use chat::ChatForwardHandler;
pub use heartbeat::HeartbeatHandler;
pub use login::LoginHandler;
pub use status::StatusHandler;

/// Everything a handler can reach while processing one packet.
///
/// One context exists per connection; the `session` slot is how a
/// connection goes from CONNECTED to AUTHENTICATED.
pub struct ConnectionContext {
    /// Write path and identity of this connection.
    pub connection: ConnectionHandle,
    gateway: Arc<GatewayContext>,
    session: RwLock<Option<Arc<ServerSession>>>,
}

impl ConnectionContext {
    pub(crate) fn new(connection: ConnectionHandle, gateway: Arc<GatewayContext>) -> Self {
        Self {
            connection,
            gateway,
            session: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.gateway.registry
    }

    pub fn validator(&self) -> &Arc<dyn TokenValidator> {
        &self.gateway.validator
    }

    pub fn bus(&self) -> &Arc<dyn MessageBus> {
        &self.gateway.bus
    }

    pub fn max_frame_bytes(&self) -> u32 {
        self.gateway.config.max_frame_bytes
    }

    /// The session this connection authenticated as, if any.
    pub fn session(&self) -> Option<Arc<ServerSession>> {
        self.session.read().clone()
    }

    pub fn set_session(&self, session: Arc<ServerSession>) {
        *self.session.write() = Some(session);
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_some()
    }

    /// Encode an envelope and queue it on this connection's write path.
    pub fn send_packet(&self, envelope: &PacketEnvelope) -> Result<(), GatewayError> {
        let frame = encode_packet(envelope, self.max_frame_bytes())?;
        self.connection.send_frame(frame)
    }
}

/// Handles all packets of one (or more) registered types.
#[async_trait]
pub trait PacketHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &ConnectionContext,
        envelope: PacketEnvelope,
    ) -> Result<(), GatewayError>;
}

/// Packet type → handler table.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<PacketType, Arc<dyn PacketHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a packet type, replacing any previous one.
    pub fn register(&self, packet_type: PacketType, handler: Arc<dyn PacketHandler>) {
        if self.handlers.insert(packet_type, handler).is_some() {
            warn!(%packet_type, "replaced existing packet handler");
        }
    }

    /// Dispatch an envelope to its handler, or log and drop it.
    pub async fn dispatch(
        &self,
        ctx: &ConnectionContext,
        envelope: PacketEnvelope,
    ) -> Result<(), GatewayError> {
        let handler = self
            .handlers
            .get(&envelope.packet_type)
            .map(|entry| entry.value().clone());

        match handler {
            Some(handler) => handler.handle(ctx, envelope).await,
            None => {
                debug!(packet_type = %envelope.packet_type, "unhandled packet type dropped");
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// The gateway's standard handler wiring.
pub fn default_handlers() -> HandlerRegistry {
    let registry = HandlerRegistry::new();
    registry.register(PacketType::ServerLogin, Arc::new(LoginHandler));
    registry.register(PacketType::ServerHeartbeat, Arc::new(HeartbeatHandler));
    registry.register(PacketType::ServerInfo, Arc::new(StatusHandler));

    let chat = Arc::new(ChatForwardHandler);
    registry.register(PacketType::ChatMsg, chat.clone());
    registry.register(PacketType::GroupChat, chat);
    registry
}
