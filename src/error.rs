//! Error types shared across the cache, store and mesh layers.
//!
//! "Not found" is never an error here: stores report it as `Ok(None)`.

use thiserror::Error;

use crate::cache::coordinator::Lifecycle;

/// Failure of the node-local key/value store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),

    #[error("store rejected write for key {key}: {reason}")]
    WriteRejected { key: String, reason: String },
}

/// Failure to hand a payload to the broadcast channel.
///
/// The coordinator treats every variant as best-effort noise and swallows it.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no connected peers to publish to")]
    NoPeers,

    #[error("channel closed")]
    Closed,

    #[error("payload of {0} bytes does not fit in a datagram")]
    PayloadTooLarge(usize),

    #[error("failed to encode mesh message: {0}")]
    Encode(#[from] bincode::Error),

    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
}

/// An inbound payload that could not be turned into a cache message.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid message encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message has no key")]
    MissingKey,

    #[error("SET message for key {0} has no value")]
    MissingValue(String),
}

/// Errors surfaced to callers of the coordinator.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("key must not be empty")]
    EmptyKey,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("coordinator cannot start from state {0:?}")]
    CannotStart(Lifecycle),
}

impl CacheError {
    /// True when the caller sent something unusable, as opposed to a node fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, CacheError::EmptyKey)
    }
}
