//! Admin command model.
//!
//! The shape the control plane publishes on the admin-command topic. A
//! command is consumed once from the bus and discarded whether or not it
//! could be delivered; there is no persistence and no redelivery once a
//! target reconnects.

use crate::error::GatewayError;
use gateway_protocol::messages::AdminCommandPayload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of administrative actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandType {
    Kick,
    Ban,
    Command,
    Message,
}

impl CommandType {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandType::Kick => "KICK",
            CommandType::Ban => "BAN",
            CommandType::Command => "COMMAND",
            CommandType::Message => "MESSAGE",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One relay request from the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCommandPacket {
    /// Token of the destination session. Never logged.
    pub token: String,
    pub command_type: CommandType,
    #[serde(default)]
    pub target_player: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    /// Reason or message text, depending on the command type.
    #[serde(default)]
    pub reason: Option<String>,
    /// Correlation id reserved for matching a future ADMIN_COMMAND_RESP.
    #[serde(default)]
    pub command_id: Option<String>,
}

impl AdminCommandPacket {
    /// Shape check: KICK and BAN need a target player, COMMAND needs a
    /// command string.
    pub fn validate(&self) -> Result<(), GatewayError> {
        let has = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
        match self.command_type {
            CommandType::Kick | CommandType::Ban if !has(&self.target_player) => {
                Err(GatewayError::InvalidCommand(format!(
                    "{} requires targetPlayer",
                    self.command_type
                )))
            }
            CommandType::Command if !has(&self.command) => Err(GatewayError::InvalidCommand(
                "COMMAND requires a command string".into(),
            )),
            _ => Ok(()),
        }
    }

    /// The outbound wire payload: everything except the token.
    pub fn to_wire_payload(&self) -> AdminCommandPayload {
        AdminCommandPayload {
            command_type: self.command_type.as_str().to_string(),
            target_player: self.target_player.clone(),
            command: self.command.clone(),
            reason: self.reason.clone(),
            command_id: self.command_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_control_plane_json() {
        let packet: AdminCommandPacket = serde_json::from_str(
            r#"{"token":"abc","commandType":"KICK","targetPlayer":"Steve","reason":"AFK","commandId":"c1"}"#,
        )
        .unwrap();
        assert_eq!(packet.command_type, CommandType::Kick);
        assert_eq!(packet.target_player.as_deref(), Some("Steve"));
        assert!(packet.validate().is_ok());
    }

    #[test]
    fn unknown_command_type_fails_to_parse() {
        let result: Result<AdminCommandPacket, _> =
            serde_json::from_str(r#"{"token":"abc","commandType":"EXPLODE"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn kick_without_target_is_invalid() {
        let packet = AdminCommandPacket {
            token: "abc".into(),
            command_type: CommandType::Kick,
            target_player: None,
            command: None,
            reason: Some("AFK".into()),
            command_id: None,
        };
        assert!(matches!(
            packet.validate(),
            Err(GatewayError::InvalidCommand(_))
        ));
    }

    #[test]
    fn command_without_command_string_is_invalid() {
        let packet = AdminCommandPacket {
            token: "abc".into(),
            command_type: CommandType::Command,
            target_player: None,
            command: Some(String::new()),
            reason: None,
            command_id: None,
        };
        assert!(packet.validate().is_err());
    }

    #[test]
    fn message_needs_no_target() {
        let packet = AdminCommandPacket {
            token: "abc".into(),
            command_type: CommandType::Message,
            target_player: None,
            command: None,
            reason: Some("maintenance in 5 minutes".into()),
            command_id: None,
        };
        assert!(packet.validate().is_ok());
    }

    #[test]
    fn wire_payload_excludes_token() {
        let packet = AdminCommandPacket {
            token: "abc".into(),
            command_type: CommandType::Ban,
            target_player: Some("Griefer".into()),
            command: None,
            reason: Some("duping".into()),
            command_id: Some("c9".into()),
        };
        let value = serde_json::to_value(packet.to_wire_payload()).unwrap();
        assert!(value.get("token").is_none());
        assert_eq!(value["commandType"], "BAN");
    }
}
