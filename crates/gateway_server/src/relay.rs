//! Command relay: bus topic → connection-specific writes.
//!
//! Bridges the admin-command topic to the gateway's write path. Delivery
//! is best-effort and at-most-once by design: a command whose target is
//! offline is logged and discarded, never queued or retried; adding
//! either would change observable behavior and belongs to a deliberate,
//! separately specified extension.

use crate::bus::{MessageBus, ADMIN_COMMAND_TOPIC};
use crate::command::AdminCommandPacket;
use crate::error::GatewayError;
use crate::registry::SessionRegistry;
use gateway_protocol::{encode_packet, PacketEnvelope, PacketType};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Subscribes to the admin-command topic and writes each deliverable
/// command to its target connection.
///
/// Read-only against the registry; runs as an independent task and never
/// blocks the acceptor or any connection's I/O.
pub struct CommandRelay {
    registry: Arc<SessionRegistry>,
    bus: Arc<dyn MessageBus>,
    max_frame_bytes: u32,
}

impl CommandRelay {
    pub fn new(
        registry: Arc<SessionRegistry>,
        bus: Arc<dyn MessageBus>,
        max_frame_bytes: u32,
    ) -> Self {
        Self {
            registry,
            bus,
            max_frame_bytes,
        }
    }

    /// Consume the admin-command topic until shutdown.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), GatewayError> {
        let mut commands = self.bus.subscribe(ADMIN_COMMAND_TOPIC).await?;
        info!(topic = ADMIN_COMMAND_TOPIC, "command relay subscribed");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("command relay stopping");
                    break;
                }
                received = commands.recv() => match received {
                    Ok(raw) => self.deliver(&raw),
                    Err(broadcast::error::RecvError::Lagged(dropped)) => {
                        // at-most-once: lagging loses commands, it never replays them
                        warn!(dropped = dropped, "command relay lagged behind the bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("admin command topic closed");
                        break;
                    }
                },
            }
        }
        Ok(())
    }

    /// Decode and deliver one bus message. Every failure mode ends in a
    /// log line and a discard; nothing propagates back to the publisher.
    pub fn deliver(&self, raw: &[u8]) {
        let command: AdminCommandPacket = match serde_json::from_slice(raw) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "discarding undecodable admin command");
                return;
            }
        };
        if let Err(e) = command.validate() {
            warn!(error = %e, "discarding malformed admin command");
            return;
        }

        let Some(session) = self.registry.get_by_token(&command.token) else {
            warn!(
                command_type = %command.command_type,
                command_id = ?command.command_id,
                "target server offline, command discarded"
            );
            return;
        };
        if !session.connection().is_active() {
            warn!(
                session_id = %session.session_id(),
                command_type = %command.command_type,
                "target connection inactive, command discarded"
            );
            return;
        }

        let frame = PacketEnvelope::new(PacketType::AdminCommand)
            .with_payload(&command.to_wire_payload())
            .and_then(|envelope| encode_packet(&envelope, self.max_frame_bytes));
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to encode admin command");
                return;
            }
        };

        match session.connection().send_frame(frame) {
            Ok(()) => info!(
                session_id = %session.session_id(),
                command_type = %command.command_type,
                command_id = ?command.command_id,
                "admin command relayed"
            ),
            Err(e) => warn!(
                session_id = %session.session_id(),
                error = %e,
                "target connection closed mid-delivery, command discarded"
            ),
        }
    }
}
