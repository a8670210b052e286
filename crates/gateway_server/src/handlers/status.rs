//! Status report handling.

use crate::bus::SERVER_STATUS_TOPIC;
use crate::error::GatewayError;
use crate::handlers::{ConnectionContext, PacketHandler};
use async_trait::async_trait;
use gateway_protocol::messages::ServerStatusPayload;
use gateway_protocol::PacketEnvelope;
use tracing::{debug, warn};

/// Folds `SERVER_INFO` telemetry into the session and republishes the
/// snapshot on the status topic, keyed by session id so downstream
/// consumers never see the token.
pub struct StatusHandler;

#[async_trait]
impl PacketHandler for StatusHandler {
    async fn handle(
        &self,
        ctx: &ConnectionContext,
        envelope: PacketEnvelope,
    ) -> Result<(), GatewayError> {
        let Some(session) = ctx.session() else {
            return Ok(());
        };

        let status: ServerStatusPayload = match envelope.payload_as() {
            Ok(status) => status,
            Err(e) => {
                warn!(session_id = %session.session_id(), error = %e, "malformed status report dropped");
                return Ok(());
            }
        };

        session.apply_status(&status);
        let snapshot = session.status_snapshot();

        let topic = format!("{}:{}", SERVER_STATUS_TOPIC, session.session_id());
        let payload = serde_json::to_vec(&snapshot)
            .map_err(|e| GatewayError::Internal(format!("status snapshot encode failed: {e}")))?;
        ctx.bus().publish(&topic, payload).await?;

        debug!(
            session_id = %session.session_id(),
            online_players = ?snapshot.online_players,
            max_players = ?snapshot.max_players,
            "status report applied"
        );
        Ok(())
    }
}
