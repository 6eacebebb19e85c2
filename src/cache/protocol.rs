//! Cache HTTP Protocol
//!
//! Endpoints and Data Transfer Objects of the front end clients use to read and
//! write the cache.

use serde::{Deserialize, Serialize};

use super::stats::StatsSnapshot;

// --- API Endpoints ---

/// `GET {ENDPOINT_CACHE}/:key` resolves a key, `POST {ENDPOINT_CACHE}` stores one.
pub const ENDPOINT_CACHE: &str = "/cache";
/// Node counters and sizes.
pub const ENDPOINT_STATS: &str = "/stats";

// --- Data Transfer Objects ---

/// Body of a write request. Both fields are optional here so a missing one can be
/// reported as a 400 rather than a deserialization failure.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: Option<String>,
    pub value: Option<String>,
}

/// A resolved entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryResponse {
    pub key: String,
    pub value: String,
}

/// Acknowledgment of a successful write.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub entries: usize,
    pub peers: usize,
    pub response_window_ms: u64,
    #[serde(flatten)]
    pub counters: StatsSnapshot,
}
