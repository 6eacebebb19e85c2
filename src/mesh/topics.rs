use dashmap::DashMap;
use tokio::sync::broadcast;

/// Fan-out of inbound payloads to local subscribers, one queue per topic.
#[derive(Debug)]
pub struct Topics {
    senders: DashMap<String, broadcast::Sender<Vec<u8>>>,
    capacity: usize,
}

impl Topics {
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: DashMap::new(),
            capacity,
        }
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Vec<u8>> {
        let capacity = self.capacity;
        self.senders
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe()
    }

    /// Returns `false` when nobody on this node listens to `topic`.
    pub fn deliver(&self, topic: &str, payload: Vec<u8>) -> bool {
        match self.senders.get(topic) {
            Some(sender) => sender.send(payload).is_ok(),
            None => {
                tracing::trace!("Dropping payload for unsubscribed topic {}", topic);
                false
            }
        }
    }
}
