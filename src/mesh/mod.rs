//! Peer Mesh Module
//!
//! The broadcast channel the cache coordinator publishes queries and answers on.
//!
//! ## Core Concepts
//! - **Topics**: every payload is published to a named topic; subscribers receive every
//!   payload on that topic, in no particular order and possibly more than once.
//! - **Best effort**: a publish never waits for delivery. It may fail outright when no
//!   peer is connected, and callers are expected to shrug that off.
//! - **Transports**: `GossipMesh` talks UDP to its direct peers with heartbeat-based
//!   liveness and relays every publish it receives to its other peers, so nodes that
//!   only share a bootstrap peer still hear each other. `LocalHub` wires several nodes together
//!   inside one process.

pub mod local;
pub mod seen;
pub mod service;
pub mod topics;
pub mod types;


use crate::error::ChannelError;

use async_trait::async_trait;
use tokio::sync::broadcast;

/// Capacity of each per-topic subscription queue. A subscriber that falls further
/// behind than this skips the oldest payloads.
pub const TOPIC_CHANNEL_CAPACITY: usize = 1024;

/// Publish/subscribe transport scoped by topic.
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    /// Hands `payload` to every reachable subscriber of `topic`.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError>;

    /// Registers a new subscriber. Payloads published before this call are not replayed.
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<Vec<u8>>;

    /// Number of peers a publish would currently reach, excluding this node.
    fn peer_count(&self) -> usize;
}
