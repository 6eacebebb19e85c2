//! In-process broadcast channel.
//!
//! Every endpoint joined to the same `LocalHub` receives every other endpoint's
//! publishes, which makes it possible to run several cache nodes inside one process.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::topics::Topics;
use super::types::PeerId;
use super::{BroadcastChannel, TOPIC_CHANNEL_CAPACITY};
use crate::error::ChannelError;

#[derive(Debug, Default)]
pub struct LocalHub {
    endpoints: DashMap<PeerId, Arc<Topics>>,
}

impl LocalHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a new endpoint to the hub. With `loopback` set, the endpoint also hears
    /// its own publishes.
    pub fn join(self: &Arc<Self>, loopback: bool) -> Arc<LocalEndpoint> {
        let id = PeerId::new();
        let topics = Arc::new(Topics::new(TOPIC_CHANNEL_CAPACITY));
        self.endpoints.insert(id.clone(), topics.clone());

        Arc::new(LocalEndpoint {
            id,
            hub: self.clone(),
            topics,
            loopback,
        })
    }

    pub fn leave(&self, id: &PeerId) {
        self.endpoints.remove(id);
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    fn others(&self, id: &PeerId) -> Vec<Arc<Topics>> {
        self.endpoints
            .iter()
            .filter(|entry| entry.key() != id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[derive(Debug)]
pub struct LocalEndpoint {
    pub id: PeerId,
    hub: Arc<LocalHub>,
    topics: Arc<Topics>,
    loopback: bool,
}

impl LocalEndpoint {
    pub fn is_joined(&self) -> bool {
        self.hub.endpoints.contains_key(&self.id)
    }
}

#[async_trait]
impl BroadcastChannel for LocalEndpoint {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        if !self.is_joined() {
            return Err(ChannelError::Closed);
        }

        if self.loopback {
            self.topics.deliver(topic, payload.clone());
        }

        let others = self.hub.others(&self.id);
        if others.is_empty() {
            return Err(ChannelError::NoPeers);
        }

        for topics in others {
            topics.deliver(topic, payload.clone());
        }

        Ok(())
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<Vec<u8>> {
        self.topics.subscribe(topic)
    }

    fn peer_count(&self) -> usize {
        self.hub.others(&self.id).len()
    }
}
