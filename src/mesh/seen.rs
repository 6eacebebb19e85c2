use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::{Duration, Instant};

/// How long a publish id is remembered after it was first seen.
pub const SEEN_TTL: Duration = Duration::from_secs(60);

/// Entries kept before expired ids are evicted eagerly.
pub const SEEN_CAPACITY: usize = 16_384;

/// Ids of publishes this node has already delivered and relayed.
pub struct SeenMessages {
    entries: DashMap<String, Instant>,
    ttl: Duration,
    capacity: usize,
}

impl SeenMessages {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity,
        }
    }

    /// Records `id` and returns true when it had not been seen within the TTL.
    pub fn first_sighting(&self, id: &str, now: Instant) -> bool {
        if self.entries.len() >= self.capacity {
            self.evict_expired(now);
        }
        // Still full of live ids: forget everything rather than grow without bound.
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }

        match self.entries.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) < self.ttl {
                    return false;
                }
                entry.insert(now);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    pub fn evict_expired(&self, now: Instant) {
        self.entries
            .retain(|_, first_seen| now.saturating_duration_since(*first_seen) < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SeenMessages {
    fn default() -> Self {
        Self::new(SEEN_TTL, SEEN_CAPACITY)
    }
}
