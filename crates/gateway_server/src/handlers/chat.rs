//! Chat forwarding.

use crate::bus::CHAT_TOPIC;
use crate::error::GatewayError;
use crate::handlers::{ConnectionContext, PacketHandler};
use async_trait::async_trait;
use gateway_protocol::messages::ChatMessagePayload;
use gateway_protocol::{current_timestamp_millis, PacketEnvelope};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

/// Normalizes inbound game chat (`CHAT_MSG`, `GROUP_CHAT`) and publishes
/// it on the chat topic. Storage and history are external collaborators;
/// the gateway only forwards.
pub struct ChatForwardHandler;

#[async_trait]
impl PacketHandler for ChatForwardHandler {
    async fn handle(
        &self,
        ctx: &ConnectionContext,
        envelope: PacketEnvelope,
    ) -> Result<(), GatewayError> {
        let Some(session) = ctx.session() else {
            return Ok(());
        };

        let chat: ChatMessagePayload = match envelope.payload_as() {
            Ok(chat) => chat,
            Err(e) => {
                warn!(session_id = %session.session_id(), error = %e, "malformed chat message dropped");
                return Ok(());
            }
        };

        let message = json!({
            "id": Uuid::new_v4().to_string(),
            "serverName": chat.server_name.unwrap_or_else(|| session.server_name()),
            "channel": chat.channel.unwrap_or_else(|| "global".to_string()),
            "world": chat.world.unwrap_or_else(|| "world".to_string()),
            "player": {
                "uuid": chat.uuid.unwrap_or_default(),
                "username": chat.player.unwrap_or_default(),
            },
            "content": chat.msg.unwrap_or_default(),
            "source": "game",
            "timestamp": current_timestamp_millis(),
        });

        let payload = serde_json::to_vec(&message)
            .map_err(|e| GatewayError::Internal(format!("chat message encode failed: {e}")))?;
        ctx.bus().publish(CHAT_TOPIC, payload).await?;

        debug!(session_id = %session.session_id(), "chat message forwarded");
        Ok(())
    }
}
