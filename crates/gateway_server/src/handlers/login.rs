//! Login handling: token validation, session creation, registry insert.

use crate::error::GatewayError;
use crate::handlers::{ConnectionContext, PacketHandler};
use crate::session::ServerSession;
use async_trait::async_trait;
use gateway_protocol::messages::{codes, ServerLoginPayload, ServerLoginResponse};
use gateway_protocol::{PacketEnvelope, PacketType};
use std::sync::Arc;
use tracing::{info, warn};

/// Processes `SERVER_LOGIN`, the only packet accepted before a connection
/// is authenticated.
///
/// Rejection policy: a failure response is written back, the connection is
/// closed, and no registry entry is created. On success the response packet
/// is queued before this handler returns, so the peer sees it before any
/// relayed command.
pub struct LoginHandler;

impl LoginHandler {
    fn reject(ctx: &ConnectionContext, code: u16, msg: &str) -> Result<(), GatewayError> {
        let response = PacketEnvelope::new(PacketType::ServerLoginResp)
            .with_payload(&ServerLoginResponse::failure(code, msg))?;
        ctx.send_packet(&response)?;
        ctx.connection.close();
        Ok(())
    }
}

#[async_trait]
impl PacketHandler for LoginHandler {
    async fn handle(
        &self,
        ctx: &ConnectionContext,
        envelope: PacketEnvelope,
    ) -> Result<(), GatewayError> {
        let Some(token) = envelope.token.as_deref().filter(|t| !t.is_empty()) else {
            warn!(connection_id = %ctx.connection.id(), "login without token rejected");
            return Self::reject(ctx, codes::LOGIN_MALFORMED, "Token must not be empty");
        };

        let login: ServerLoginPayload = match envelope.payload_as() {
            Ok(login) => login,
            Err(e) => {
                warn!(connection_id = %ctx.connection.id(), error = %e, "malformed login rejected");
                return Self::reject(ctx, codes::LOGIN_MALFORMED, "Malformed login packet");
            }
        };

        if !ctx.validator().validate(token).await {
            // the token value itself stays out of the logs
            warn!(
                connection_id = %ctx.connection.id(),
                server_name = %login.server_name,
                "login with invalid or disabled token rejected"
            );
            return Self::reject(ctx, codes::LOGIN_INVALID_TOKEN, "Token invalid or disabled");
        }

        let session = Arc::new(ServerSession::new(
            token.to_string(),
            &login,
            ctx.connection.clone(),
        ));
        let session_id = session.session_id();

        // Last-login-wins in the registry; single-active-session is policy
        // applied here by force-closing whatever the new login displaced.
        if let Some(displaced) = ctx.registry().insert(session.clone()) {
            if displaced.connection().id() != ctx.connection.id() {
                warn!(
                    displaced_session = %displaced.session_id(),
                    session_id = %session_id,
                    "duplicate token login, disconnecting previous session"
                );
                displaced.connection().close();
            }
        }
        ctx.set_session(session);

        let response = PacketEnvelope::new(PacketType::ServerLoginResp)
            .with_payload(&ServerLoginResponse::success(session_id.to_string()))?;
        ctx.send_packet(&response)?;

        info!(
            session_id = %session_id,
            server_name = %login.server_name,
            login_ip = %ctx.connection.remote_addr().ip(),
            "game server logged in"
        );
        Ok(())
    }
}
