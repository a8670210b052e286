//! Typed payloads for the packets the gateway itself speaks.
//!
//! Wire field names are camelCase. These cover the server-management band
//! (login, login response, heartbeat, status report, admin command) plus
//! the inbound chat shape the gateway forwards to the bus. Game-play bands
//! are catalogued for dispatch but carry no typed payloads here; the
//! gateway routes or drops them without interpreting their bodies.

use serde::{Deserialize, Serialize};

/// Login response codes.
pub mod codes {
    /// Login accepted; a session was created.
    pub const LOGIN_OK: u16 = 100;
    /// Token unresolvable or disabled.
    pub const LOGIN_INVALID_TOKEN: u16 = 101;
    /// Login packet missing required fields.
    pub const LOGIN_MALFORMED: u16 = 102;
}

/// `SERVER_LOGIN` payload. The token itself travels in the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerLoginPayload {
    pub server_name: String,
    #[serde(default)]
    pub server_version: Option<String>,
    /// Address the game server reports for itself; the gateway records
    /// the observed peer address separately.
    #[serde(default)]
    pub server_ip: Option<String>,
}

/// `SERVER_LOGIN_RESP` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerLoginResponse {
    pub code: u16,
    pub msg: String,
    /// Present on success: the opaque id safe to expose in logs and UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ServerLoginResponse {
    pub fn success(session_id: impl Into<String>) -> Self {
        Self {
            code: codes::LOGIN_OK,
            msg: "Login Success".into(),
            session_id: Some(session_id.into()),
        }
    }

    pub fn failure(code: u16, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            session_id: None,
        }
    }
}

/// One entry of a status report's player list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    #[serde(default)]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub ping: Option<u32>,
    #[serde(default)]
    pub world: Option<String>,
    #[serde(default)]
    pub game_mode: Option<String>,
}

/// One entry of a status report's plugin list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `SERVER_INFO` payload: the telemetry a game server pushes about itself.
///
/// Also the shape republished on the status topic, with `session_id`
/// filled in so consumers never see the token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatusPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub motd: Option<String>,
    #[serde(default)]
    pub online_players: Option<u32>,
    #[serde(default)]
    pub max_players: Option<u32>,
    #[serde(default)]
    pub tps: Option<f64>,
    /// Memory usage in megabytes.
    #[serde(default)]
    pub ram_usage: Option<u64>,
    #[serde(default)]
    pub max_ram: Option<u64>,
    #[serde(default)]
    pub player_list: Vec<PlayerInfo>,
    #[serde(default)]
    pub plugin_list: Vec<PluginInfo>,
}

/// `ADMIN_COMMAND` payload written to a game server's connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCommandPayload {
    pub command_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_player: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
}

/// Inbound chat shape (`CHAT_MSG` / `GROUP_CHAT`) the gateway normalizes
/// and forwards to the chat topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub world: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}
