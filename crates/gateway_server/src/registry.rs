//! Concurrent session registry.
//!
//! The bidirectional index from authentication token to live session and
//! back from connection identity to token. This is the only state shared
//! between the connection workers and the command relay; the gateway is
//! the only writer (connection open/close), the relay reads only.
//!
//! Both directions are updated under one lock, so no observer can see a
//! token mapped to a session whose connection the reverse map has already
//! forgotten, or vice versa.

use crate::connection::ConnectionId;
use crate::session::ServerSession;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct RegistryInner {
    by_token: HashMap<String, Arc<ServerSession>>,
    token_by_connection: HashMap<ConnectionId, String>,
}

/// Bidirectional token ↔ connection index for live sessions.
///
/// Explicitly owned and injected: the binary creates one instance and
/// hands it to both the gateway and the relay.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, replacing any session already held by its token.
    ///
    /// Last-login-wins: the displaced session (if any) is returned with
    /// its reverse entry already removed, so the caller can decide what
    /// to do with its connection. The registry itself does not enforce
    /// single-active-session.
    pub fn insert(&self, session: Arc<ServerSession>) -> Option<Arc<ServerSession>> {
        let token = session.token().to_string();
        let connection_id = session.connection().id();

        let mut inner = self.inner.write();
        // a connection re-registering under a new token releases its old
        // entry, keeping the two directions consistent
        if let Some(previous_token) = inner.token_by_connection.remove(&connection_id) {
            if previous_token != token {
                inner.by_token.remove(&previous_token);
            }
        }
        let displaced = inner.by_token.insert(token.clone(), session);
        if let Some(old) = &displaced {
            inner.token_by_connection.remove(&old.connection().id());
        }
        inner.token_by_connection.insert(connection_id, token);
        displaced
    }

    /// Look up the live session for a token.
    pub fn get_by_token(&self, token: &str) -> Option<Arc<ServerSession>> {
        self.inner.read().by_token.get(token).cloned()
    }

    /// Remove whatever session owns this connection, both directions.
    ///
    /// Idempotent: removing a connection with no entry is a no-op. Returns
    /// the removed session so the caller can log its identity.
    pub fn remove_by_connection(&self, connection_id: ConnectionId) -> Option<Arc<ServerSession>> {
        let mut inner = self.inner.write();
        let token = inner.token_by_connection.remove(&connection_id)?;
        inner.by_token.remove(&token)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.read().by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_token.is_empty()
    }

    /// Session handles for logging/telemetry sweeps, in no defined order.
    pub fn sessions(&self) -> Vec<Arc<ServerSession>> {
        self.inner.read().by_token.values().cloned().collect()
    }
}
