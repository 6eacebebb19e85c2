use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh id for a publish, carried unchanged by every relayed copy.
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PeerState {
    Alive,
    Suspect,
    Dead,
}

/// A directly connected peer as seen from this node.
///
/// `addr` is the address its datagrams arrive from, which is also where replies go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
    pub id: PeerId,
    pub addr: SocketAddr,
    pub state: PeerState,

    #[serde(skip)]
    pub last_seen: Option<Instant>,
}

/// Datagrams exchanged between mesh nodes.
///
/// - `Join`: sent to every configured peer at startup (and again while none answered).
/// - `Ping/Ack`: heartbeat keeping a link alive.
/// - `Publish`: a topic payload. The receiver delivers it to its local subscribers and
///   relays it to its other live peers. `from` is the hop that sent this copy, `origin`
///   the node that published it; `id` is shared by every copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MeshMessage {
    Join {
        from: PeerId,
    },

    Ping {
        from: PeerId,
    },

    Ack {
        from: PeerId,
    },

    Publish {
        id: String,
        origin: PeerId,
        from: PeerId,
        topic: String,
        payload: Vec<u8>,
    },
}
