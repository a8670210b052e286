//! Server session model.
//!
//! A [`ServerSession`] is the server-side record of one authenticated,
//! live game-server connection: the identity established at login plus
//! the telemetry that heartbeat and status packets refresh in place.

use crate::connection::ConnectionHandle;
use gateway_protocol::messages::{PlayerInfo, PluginInfo, ServerLoginPayload, ServerStatusPayload};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::SystemTime;
use uuid::Uuid;

/// Opaque session identifier, generated at session creation.
///
/// Safe to expose in logs and UI. The token never is, and a session id
/// is never equal to its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The fields a session's heartbeat and status packets keep current.
#[derive(Debug, Clone)]
pub struct SessionTelemetry {
    pub server_name: String,
    pub server_version: Option<String>,
    pub motd: Option<String>,
    pub online_players: Option<u32>,
    pub max_players: Option<u32>,
    pub tps: Option<f64>,
    pub ram_usage: Option<u64>,
    pub max_ram: Option<u64>,
    pub player_list: Vec<PlayerInfo>,
    pub plugin_list: Vec<PluginInfo>,
    pub last_active_time: SystemTime,
}

/// One authenticated, live game-server connection.
pub struct ServerSession {
    token: String,
    session_id: SessionId,
    connection: ConnectionHandle,
    login_ip: IpAddr,
    login_time: SystemTime,
    telemetry: RwLock<SessionTelemetry>,
}

impl ServerSession {
    /// Create a session from a validated login.
    pub fn new(token: String, login: &ServerLoginPayload, connection: ConnectionHandle) -> Self {
        let login_ip = connection.remote_addr().ip();
        Self {
            token,
            session_id: SessionId::new(),
            connection,
            login_ip,
            login_time: SystemTime::now(),
            telemetry: RwLock::new(SessionTelemetry {
                server_name: login.server_name.clone(),
                server_version: login.server_version.clone(),
                motd: None,
                online_players: None,
                max_players: None,
                tps: None,
                ram_usage: None,
                max_ram: None,
                player_list: Vec::new(),
                plugin_list: Vec::new(),
                last_active_time: SystemTime::now(),
            }),
        }
    }

    /// The authentication credential this session was created with.
    /// Registry key only; must never be logged or republished.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn login_ip(&self) -> IpAddr {
        self.login_ip
    }

    pub fn login_time(&self) -> SystemTime {
        self.login_time
    }

    pub fn server_name(&self) -> String {
        self.telemetry.read().server_name.clone()
    }

    pub fn last_active_time(&self) -> SystemTime {
        self.telemetry.read().last_active_time
    }

    /// Refresh liveness; called for every heartbeat and status packet.
    pub fn touch(&self) {
        self.telemetry.write().last_active_time = SystemTime::now();
    }

    /// Fold a status report into the session, refreshing liveness.
    ///
    /// Absent optional fields leave the previous values standing, so a
    /// sparse report never erases known telemetry.
    pub fn apply_status(&self, status: &ServerStatusPayload) {
        let mut telemetry = self.telemetry.write();
        if let Some(name) = &status.server_name {
            telemetry.server_name = name.clone();
        }
        if status.motd.is_some() {
            telemetry.motd = status.motd.clone();
        }
        if status.online_players.is_some() {
            telemetry.online_players = status.online_players;
        }
        if status.max_players.is_some() {
            telemetry.max_players = status.max_players;
        }
        if status.tps.is_some() {
            telemetry.tps = status.tps;
        }
        if status.ram_usage.is_some() {
            telemetry.ram_usage = status.ram_usage;
        }
        if status.max_ram.is_some() {
            telemetry.max_ram = status.max_ram;
        }
        if !status.player_list.is_empty() {
            telemetry.player_list = status.player_list.clone();
        }
        if !status.plugin_list.is_empty() {
            telemetry.plugin_list = status.plugin_list.clone();
        }
        telemetry.last_active_time = SystemTime::now();
    }

    /// Current telemetry as a status payload, tagged with the session id
    /// so downstream consumers never need (or see) the token.
    pub fn status_snapshot(&self) -> ServerStatusPayload {
        let telemetry = self.telemetry.read();
        ServerStatusPayload {
            session_id: Some(self.session_id.to_string()),
            server_name: Some(telemetry.server_name.clone()),
            motd: telemetry.motd.clone(),
            online_players: telemetry.online_players,
            max_players: telemetry.max_players,
            tps: telemetry.tps,
            ram_usage: telemetry.ram_usage,
            max_ram: telemetry.max_ram,
            player_list: telemetry.player_list.clone(),
            plugin_list: telemetry.plugin_list.clone(),
        }
    }
}

impl fmt::Debug for ServerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // token deliberately omitted
        f.debug_struct("ServerSession")
            .field("session_id", &self.session_id)
            .field("connection_id", &self.connection.id())
            .field("login_ip", &self.login_ip)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::{mpsc, watch};

    fn test_connection() -> ConnectionHandle {
        let (outbound_tx, _outbound_rx) = mpsc::unbounded_channel();
        let (closed_tx, _closed_rx) = watch::channel(false);
        ConnectionHandle::new("10.0.0.1:5555".parse().unwrap(), outbound_tx, closed_tx)
    }

    fn test_login() -> ServerLoginPayload {
        ServerLoginPayload {
            server_name: "Lobby".into(),
            server_version: Some("1.20".into()),
            server_ip: Some("10.0.0.1".into()),
        }
    }

    #[test]
    fn session_id_never_equals_token() {
        let session = ServerSession::new("abc".into(), &test_login(), test_connection());
        assert_ne!(session.session_id().to_string(), session.token());
        assert_eq!(session.login_ip(), "10.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn sparse_status_report_keeps_previous_values() {
        let session = ServerSession::new("abc".into(), &test_login(), test_connection());

        session.apply_status(&ServerStatusPayload {
            online_players: Some(7),
            max_players: Some(20),
            motd: Some("welcome".into()),
            ..Default::default()
        });
        session.apply_status(&ServerStatusPayload {
            online_players: Some(8),
            ..Default::default()
        });

        let snapshot = session.status_snapshot();
        assert_eq!(snapshot.online_players, Some(8));
        assert_eq!(snapshot.max_players, Some(20));
        assert_eq!(snapshot.motd.as_deref(), Some("welcome"));
    }

    #[test]
    fn snapshot_carries_session_id_not_token() {
        let session = ServerSession::new("secret-token".into(), &test_login(), test_connection());
        let snapshot = session.status_snapshot();
        assert_eq!(snapshot.session_id, Some(session.session_id().to_string()));
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("secret-token"));
    }

    #[test]
    fn touch_advances_last_active_time() {
        let session = ServerSession::new("abc".into(), &test_login(), test_connection());
        let before = session.last_active_time();
        session.touch();
        assert!(session.last_active_time() >= before);
    }

    #[test]
    fn debug_output_omits_token() {
        let session = ServerSession::new("secret-token".into(), &test_login(), test_connection());
        assert!(!format!("{session:?}").contains("secret-token"));
    }
}
