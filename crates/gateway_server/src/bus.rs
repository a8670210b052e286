//! Pub/sub bus seam.
//!
//! The control plane reaches the gateway through a named publish/subscribe
//! topic, and the gateway pushes status and chat traffic back out the same
//! way. Which bus actually carries the topics is a deployment concern;
//! the gateway only depends on [`MessageBus`]. Delivery semantics are
//! whatever the bus provides (typically at-most-once fan-out); nothing in
//! this crate adds retry or persistence on top.
//!
//! [`InProcessBus`] is the broadcast-channel implementation used by the
//! binary and the tests.

use crate::error::GatewayError;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

/// Topic carrying admin commands from the control plane to the relay.
pub const ADMIN_COMMAND_TOPIC: &str = "fleetgate:admin:command";

/// Topic prefix for per-session status snapshots published on SERVER_INFO.
pub const SERVER_STATUS_TOPIC: &str = "fleetgate:server:status";

/// Topic for normalized game chat messages.
pub const CHAT_TOPIC: &str = "fleetgate:chat:message";

/// A named-topic publish/subscribe boundary.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a payload to a topic. Publishing to a topic nobody listens
    /// on is not an error. Fan-out semantics, not queueing.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), GatewayError>;

    /// Subscribe to a topic, receiving payloads published after this call.
    async fn subscribe(&self, topic: &str) -> Result<broadcast::Receiver<Vec<u8>>, GatewayError>;
}

/// Broadcast-channel bus for single-process deployments and tests.
#[derive(Debug)]
pub struct InProcessBus {
    topics: DashMap<String, broadcast::Sender<Vec<u8>>>,
    capacity: usize,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Capacity bounds how far a subscriber may lag before messages are
    /// dropped for it; dropping is the correct behavior here.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InProcessBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), GatewayError> {
        // send only fails when there are no receivers, which is fine
        let _ = self.sender_for(topic).send(payload);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<broadcast::Receiver<Vec<u8>>, GatewayError> {
        Ok(self.sender_for(topic).subscribe())
    }
}
