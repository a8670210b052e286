//! # Gateway Server - Connection Gateway Infrastructure
//!
//! A long-lived connection gateway that lets a fleet of remote game-server
//! processes hold persistent TCP sessions with a central control plane, and
//! relays administrative commands (kick/ban/run-command/broadcast) from the
//! control plane to the correct live connection.
//!
//! ## Architecture Overview
//!
//! * **Session Registry** - Concurrent bidirectional token ↔ connection map,
//!   the only state shared across connection workers and the relay
//! * **Connection Gateway** - Accept loops, per-connection framing pipeline,
//!   handler-table dispatch, connection lifecycle
//! * **Command Relay** - Bridges the admin-command bus topic into
//!   connection-specific writes, best-effort and at-most-once
//! * **Seams** - Token validation ([`auth::TokenValidator`]) and the
//!   pub/sub bus ([`bus::MessageBus`]) are trait boundaries; the
//!   authentication store and the production bus are external collaborators
//!
//! ## Message Flow
//!
//! 1. A game server connects over TCP and sends a `SERVER_LOGIN` frame
//! 2. The token is validated and a [`session::ServerSession`] is registered
//! 3. Heartbeat and status frames keep the session alive and current
//! 4. Admin commands arrive on the bus, are resolved against the registry,
//!    and are written to the target connection, or dropped with a warning
//!    when the target is offline
//!
//! ## Error Containment
//!
//! No error from processing one message or one connection may affect
//! another connection or the relay. Only transport-level framing violations
//! terminate the connection that produced them.

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use registry::SessionRegistry;
pub use relay::CommandRelay;

pub mod auth;
pub mod bus;
pub mod command;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod registry;
pub mod relay;
pub mod session;

mod connection;

pub use connection::{ConnectionHandle, ConnectionId};
