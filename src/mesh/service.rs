use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use std::{net::SocketAddr, time::Duration};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::seen::SeenMessages;
use super::topics::Topics;
use super::types::{MeshMessage, Peer, PeerId, PeerState, new_message_id};
use super::{BroadcastChannel, TOPIC_CHANNEL_CAPACITY};
use crate::error::ChannelError;

const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);
const FAILURE_DETECTION_INTERVAL: Duration = Duration::from_secs(2);
const SUSPECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest UDP payload that fits in a single IPv4 datagram.
const MAX_DATAGRAM: usize = 65_507;

#[derive(Debug, Clone)]
pub struct MeshConfig {
    pub bind_addr: SocketAddr,
    /// Direct peers to join at startup.
    pub peers: Vec<SocketAddr>,
    /// Deliver this node's own publishes to its local subscribers.
    pub loopback: bool,
    /// When false, publishing with no live peer fails with `ChannelError::NoPeers`.
    pub allow_publish_to_zero_peers: bool,
}

impl MeshConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            peers: Vec::new(),
            loopback: false,
            allow_publish_to_zero_peers: true,
        }
    }
}

/// UDP broadcast channel over a flooding mesh.
///
/// Every publish reaches the direct peers, and each receiver relays it to its own live
/// peers except the hop it came from and the node that published it. Relayed copies
/// keep the publish id, so a node delivers and relays a given publish only once.
pub struct GossipMesh {
    pub local_id: PeerId,
    pub peers: Arc<DashMap<PeerId, Peer>>,
    socket: Arc<UdpSocket>,
    topics: Topics,
    seen: SeenMessages,
    config: MeshConfig,
}

impl GossipMesh {
    pub async fn bind(config: MeshConfig) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        let mesh = Arc::new(Self {
            local_id: PeerId::new(),
            peers: Arc::new(DashMap::new()),
            socket: Arc::new(socket),
            topics: Topics::new(TOPIC_CHANNEL_CAPACITY),
            seen: SeenMessages::default(),
            config,
        });

        if !mesh.config.peers.is_empty() {
            info!("Joining mesh via {} direct peer(s)", mesh.config.peers.len());
            mesh.join_configured_peers().await;
        }

        Ok(mesh)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Spawns the receive, heartbeat and failure detection loops. They stop once
    /// `shutdown` is cancelled.
    pub fn start(self: &Arc<Self>, shutdown: CancellationToken) {
        tracing::info!("Starting mesh service...");

        {
            let mesh = self.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = mesh.receive_loop() => {}
                }
            });
        }

        {
            let mesh = self.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = mesh.heartbeat_loop() => {}
                }
            });
        }

        {
            let mesh = self.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = mesh.failure_detection_loop() => {}
                }
            });
        }

        tracing::info!("All mesh background tasks started");
    }

    pub fn alive_peers(&self) -> Vec<Peer> {
        self.peers
            .iter()
            .filter(|entry| entry.value().state == PeerState::Alive)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn get_peer(&self, id: &PeerId) -> Option<Peer> {
        self.peers.get(id).map(|entry| entry.value().clone())
    }

    async fn join_configured_peers(&self) {
        let msg = MeshMessage::Join {
            from: self.local_id.clone(),
        };

        for addr in &self.config.peers {
            match self.send(&msg, *addr).await {
                Ok(()) => info!("Sent join request to {}", addr),
                Err(e) => tracing::warn!("Failed to send join request to {}: {}", addr, e),
            }
        }
    }

    async fn send(&self, msg: &MeshMessage, addr: SocketAddr) -> Result<(), ChannelError> {
        let encoded = bincode::serialize(msg)?;
        self.socket.send_to(&encoded, addr).await?;
        Ok(())
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);

        loop {
            interval.tick().await;

            let alive_peers = self.alive_peers();

            if alive_peers.is_empty() {
                if !self.config.peers.is_empty() {
                    self.join_configured_peers().await;
                }
                continue;
            }

            let target = {
                use rand::Rng;
                let idx = rand::thread_rng().gen_range(0..alive_peers.len());
                &alive_peers[idx]
            };

            let msg = MeshMessage::Ping {
                from: self.local_id.clone(),
            };

            if let Err(e) = self.send(&msg, target.addr).await {
                tracing::warn!("Failed to send ping to {}: {}", target.id, e);
            } else {
                tracing::trace!("Sent ping to {}", target.id);
            }
        }
    }

    async fn receive_loop(self: Arc<Self>) {
        let mut buf = vec![0u8; 65536];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, src)) => match bincode::deserialize::<MeshMessage>(&buf[..len]) {
                    Ok(msg) => {
                        if let Err(e) = self.handle_message(msg, src).await {
                            tracing::error!("Error handling message from {}: {}", src, e);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to deserialize message from {}: {}", src, e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to receive UDP packet: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    pub(crate) async fn handle_message(
        &self,
        msg: MeshMessage,
        src: SocketAddr,
    ) -> Result<(), ChannelError> {
        match msg {
            MeshMessage::Join { from } => {
                info!("Peer {} joining from {}", from, src);
                self.touch(from, src);
                self.reply_ack(src).await?;
            }

            MeshMessage::Ping { from } => {
                self.touch(from, src);
                self.reply_ack(src).await?;
            }

            MeshMessage::Ack { from } => {
                self.touch(from, src);
            }

            MeshMessage::Publish {
                id,
                origin,
                from,
                topic,
                payload,
            } => {
                if origin == self.local_id || from == self.local_id {
                    return Ok(());
                }
                self.touch(from.clone(), src);

                if !self.seen.first_sighting(&id, Instant::now()) {
                    tracing::trace!("Dropping duplicate publish {} from {}", id, from);
                    return Ok(());
                }

                self.relay(&id, &origin, &from, &topic, &payload).await;
                self.topics.deliver(&topic, payload);
            }
        }

        Ok(())
    }

    /// Forwards a publish to every live peer except the hop it came from and its origin.
    async fn relay(
        &self,
        id: &str,
        origin: &PeerId,
        from: &PeerId,
        topic: &str,
        payload: &[u8],
    ) {
        let targets: Vec<Peer> = self
            .alive_peers()
            .into_iter()
            .filter(|peer| peer.id != *from && peer.id != *origin)
            .collect();
        if targets.is_empty() {
            return;
        }

        let msg = MeshMessage::Publish {
            id: id.to_string(),
            origin: origin.clone(),
            from: self.local_id.clone(),
            topic: topic.to_string(),
            payload: payload.to_vec(),
        };
        let encoded = match bincode::serialize(&msg) {
            Ok(encoded) if encoded.len() <= MAX_DATAGRAM => encoded,
            Ok(encoded) => {
                tracing::warn!(
                    "Not relaying {}: {} bytes exceed a datagram",
                    id,
                    encoded.len()
                );
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to encode relay of {}: {}", id, e);
                return;
            }
        };

        for peer in &targets {
            if let Err(e) = self.socket.send_to(&encoded, peer.addr).await {
                tracing::warn!("Failed to relay {} to {}: {}", id, peer.id, e);
            }
        }
        tracing::trace!("Relayed {} to {} peer(s)", id, targets.len());
    }

    async fn reply_ack(&self, src: SocketAddr) -> Result<(), ChannelError> {
        let reply = MeshMessage::Ack {
            from: self.local_id.clone(),
        };
        self.send(&reply, src).await
    }

    /// Records contact with a peer. Any datagram revives a suspected or dead peer.
    fn touch(&self, id: PeerId, addr: SocketAddr) {
        if id == self.local_id {
            return;
        }

        match self.peers.get_mut(&id) {
            Some(mut peer) => {
                if peer.state != PeerState::Alive {
                    tracing::info!("Peer {} at {} is alive again", peer.id, addr);
                }
                peer.state = PeerState::Alive;
                peer.addr = addr;
                peer.last_seen = Some(Instant::now());
            }
            None => {
                tracing::info!("Discovered new peer {} at {}", id, addr);
                self.peers.insert(
                    id.clone(),
                    Peer {
                        id,
                        addr,
                        state: PeerState::Alive,
                        last_seen: Some(Instant::now()),
                    },
                );
                tracing::info!("Mesh size now: {} peer(s)", self.peers.len());
            }
        }
    }

    async fn failure_detection_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(FAILURE_DETECTION_INTERVAL);

        loop {
            interval.tick().await;
            let now = Instant::now();
            self.detect_failures(now);
            self.seen.evict_expired(now);
        }
    }

    pub(crate) fn detect_failures(&self, now: Instant) {
        for mut entry in self.peers.iter_mut() {
            let peer = entry.value_mut();

            let Some(last_seen) = peer.last_seen else {
                peer.last_seen = Some(now);
                continue;
            };
            let elapsed = now.saturating_duration_since(last_seen);

            match peer.state {
                PeerState::Alive if elapsed > SUSPECT_TIMEOUT => {
                    tracing::warn!("Peer {} suspected (no contact for {:?})", peer.id, elapsed);
                    peer.state = PeerState::Suspect;
                }
                PeerState::Suspect if elapsed > DEAD_TIMEOUT => {
                    tracing::info!("Peer {} declared dead (no contact for {:?})", peer.id, elapsed);
                    peer.state = PeerState::Dead;
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl BroadcastChannel for GossipMesh {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        let targets = self.alive_peers();

        let id = new_message_id();
        self.seen.first_sighting(&id, Instant::now());
        let msg = MeshMessage::Publish {
            id,
            origin: self.local_id.clone(),
            from: self.local_id.clone(),
            topic: topic.to_string(),
            payload,
        };
        let encoded = bincode::serialize(&msg)?;
        if encoded.len() > MAX_DATAGRAM {
            return Err(ChannelError::PayloadTooLarge(encoded.len()));
        }

        if self.config.loopback
            && let MeshMessage::Publish { payload, .. } = msg
        {
            self.topics.deliver(topic, payload);
        }

        if targets.is_empty() {
            if self.config.allow_publish_to_zero_peers {
                tracing::debug!("Published to zero peers on topic {}", topic);
                return Ok(());
            }
            return Err(ChannelError::NoPeers);
        }

        let mut last_error = None;
        let mut delivered = 0usize;
        for peer in &targets {
            match self.socket.send_to(&encoded, peer.addr).await {
                Ok(_) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Failed to publish to {}: {}", peer.id, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if delivered == 0 => Err(ChannelError::Io(e)),
            _ => Ok(()),
        }
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<Vec<u8>> {
        self.topics.subscribe(topic)
    }

    fn peer_count(&self) -> usize {
        self.alive_peers().len()
    }
}
