//! Local Store Module
//!
//! The node-local key/value store the cache coordinator reads and fills.
//!
//! ## Contract
//! - **Tagged lookups**: `get` answers `Ok(Some(value))`, `Ok(None)` (not found) or
//!   `Err(StoreError)` (backend failure), so a miss can never be confused with a fault.
//! - **Per-key atomicity**: a `get` observes either the previous or the new value of a
//!   concurrent `put` on the same key. Nothing is promised across keys.
//! - **No expiry**: entries live until overwritten.

pub mod memory;

#[cfg(test)]
mod tests;

use crate::error::StoreError;

/// Synchronous key/value storage owned by a single node.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Inserts or overwrites `key`.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Number of entries currently held, for reporting only.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
