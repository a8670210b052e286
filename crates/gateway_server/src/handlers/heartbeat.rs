//! Heartbeat handling.

use crate::error::GatewayError;
use crate::handlers::{ConnectionContext, PacketHandler};
use async_trait::async_trait;
use gateway_protocol::PacketEnvelope;
use tracing::debug;

/// Refreshes a session's liveness on `SERVER_HEARTBEAT`.
pub struct HeartbeatHandler;

#[async_trait]
impl PacketHandler for HeartbeatHandler {
    async fn handle(
        &self,
        ctx: &ConnectionContext,
        _envelope: PacketEnvelope,
    ) -> Result<(), GatewayError> {
        if let Some(session) = ctx.session() {
            session.touch();
            debug!(session_id = %session.session_id(), "heartbeat");
        }
        Ok(())
    }
}
