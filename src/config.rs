//! Node configuration from the command line.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::cache::coordinator::{CoordinatorConfig, DEFAULT_TOPIC};
use crate::mesh::service::MeshConfig;

/// Peer-to-peer cache node
#[derive(Debug, Clone, Parser)]
#[command(
    name = "p2p-cache",
    about = "Key/value cache node that fills misses from its peers",
    version
)]
pub struct NodeArgs {
    /// Address the HTTP front end listens on
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub http_addr: SocketAddr,

    /// UDP address of the mesh socket (port 0 picks a free one)
    #[arg(long, default_value = "0.0.0.0:0")]
    pub gossip_addr: SocketAddr,

    /// Direct peer to connect to, may be repeated
    #[arg(long = "peer", value_name = "ADDR")]
    pub peers: Vec<SocketAddr>,

    /// Broadcast topic shared by all nodes of the cache
    #[arg(long, default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// How long a miss waits for peers to answer, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub response_window_ms: u64,

    /// Always wait the full response window, even after an answer arrived
    #[arg(long)]
    pub no_early_completion: bool,

    /// Deliver this node's own broadcasts back to itself
    #[arg(long)]
    pub loopback: bool,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); RUST_LOG takes precedence
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    pub log_level: String,
}

impl NodeArgs {
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            topic: self.topic.clone(),
            response_window: Duration::from_millis(self.response_window_ms),
            early_completion: !self.no_early_completion,
        }
    }

    pub fn mesh_config(&self) -> MeshConfig {
        MeshConfig {
            bind_addr: self.gossip_addr,
            peers: self.peers.clone(),
            loopback: self.loopback,
            allow_publish_to_zero_peers: true,
        }
    }
}
