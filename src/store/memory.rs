use super::LocalStore;
use crate::error::StoreError;

use dashmap::DashMap;

/// In-memory store backed by a sharded concurrent map.
///
/// Each shard is locked only for the duration of a single `get`/`put`, which is what
/// gives the per-key atomicity the coordinator relies on.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out every entry. Order is unspecified.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|value| value.value().clone()))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
