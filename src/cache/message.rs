//! Cache wire messages.
//!
//! On the broadcast channel a message is a JSON object
//! `{"action": "GET" | "SET", "key": "...", "value": "..."}` where `value` only appears
//! on `SET`. Unknown actions decode to `None` so newer peers can extend the protocol.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

pub const ACTION_GET: &str = "GET";
pub const ACTION_SET: &str = "SET";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMessage {
    /// Broadcast by a node that missed on `key`.
    Query { key: String },
    /// Broadcast by a node that holds `key` and saw a query for it.
    Answer { key: String, value: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    action: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl CacheMessage {
    pub fn key(&self) -> &str {
        match self {
            CacheMessage::Query { key } | CacheMessage::Answer { key, .. } => key,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            CacheMessage::Query { .. } => ACTION_GET,
            CacheMessage::Answer { .. } => ACTION_SET,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let wire = match self {
            CacheMessage::Query { key } => WireMessage {
                action: ACTION_GET.to_string(),
                key: Some(key.clone()),
                value: None,
            },
            CacheMessage::Answer { key, value } => WireMessage {
                action: ACTION_SET.to_string(),
                key: Some(key.clone()),
                value: Some(value.clone()),
            },
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    /// Returns `Ok(None)` for a well-formed message with an action this node does not know.
    pub fn decode(payload: &[u8]) -> Result<Option<Self>, CodecError> {
        let wire: WireMessage = serde_json::from_slice(payload)?;

        let known = wire.action == ACTION_GET || wire.action == ACTION_SET;
        if !known {
            return Ok(None);
        }

        let key = match wire.key {
            Some(key) if !key.is_empty() => key,
            _ => return Err(CodecError::MissingKey),
        };

        if wire.action == ACTION_GET {
            return Ok(Some(CacheMessage::Query { key }));
        }

        match wire.value {
            Some(value) => Ok(Some(CacheMessage::Answer { key, value })),
            None => Err(CodecError::MissingValue(key)),
        }
    }
}
