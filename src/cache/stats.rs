use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters of coordinator activity.
#[derive(Debug, Default)]
pub struct CoordinatorStats {
    hits: AtomicU64,
    misses: AtomicU64,
    queries_published: AtomicU64,
    answers_published: AtomicU64,
    answers_absorbed: AtomicU64,
    dropped_messages: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub queries_published: u64,
    pub answers_published: u64,
    pub answers_absorbed: u64,
    pub dropped_messages: u64,
}

impl CoordinatorStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query(&self) {
        self.queries_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_answer(&self) {
        self.answers_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_absorbed(&self) {
        self.answers_absorbed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, count: u64) {
        self.dropped_messages.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            queries_published: self.queries_published.load(Ordering::Relaxed),
            answers_published: self.answers_published.load(Ordering::Relaxed),
            answers_absorbed: self.answers_absorbed.load(Ordering::Relaxed),
            dropped_messages: self.dropped_messages.load(Ordering::Relaxed),
        }
    }
}
