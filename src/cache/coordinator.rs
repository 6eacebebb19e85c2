//! Cache Coordinator
//!
//! Resolves keys against the local store and, on a miss, against the peer mesh.
//!
//! ## Resolution
//! `Idle -> Querying(key) -> AwaitingAnswers(deadline) -> Resolved | Absent`
//!
//! A hit returns without touching the network. A miss publishes exactly one `Query`,
//! waits out the response window and reads the store again. Whatever the delivery loop
//! wrote in the meantime (the answer to this query, or any other) is what the caller
//! gets. Store failures on this path read as a miss.
//!
//! ## Delivery
//! A single task consumes the topic subscription. Queries are answered from the store
//! when it holds the key and ignored otherwise; answers are written to the store
//! unconditionally, solicited or not.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::message::CacheMessage;
use super::stats::{CoordinatorStats, StatsSnapshot};
use super::window::{AnswerSignals, ResolutionAttempt};
use crate::error::CacheError;
use crate::mesh::BroadcastChannel;
use crate::store::LocalStore;

pub const DEFAULT_TOPIC: &str = "p2p-cache";
pub const DEFAULT_RESPONSE_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Broadcast topic queries and answers travel on.
    pub topic: String,
    /// How long a miss waits for peers before giving up.
    pub response_window: Duration,
    /// End the window as soon as an answer for the missed key is stored.
    pub early_completion: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            response_window: DEFAULT_RESPONSE_WINDOW,
            early_completion: true,
        }
    }
}

/// Collaborators a coordinator works against. Nothing is shared between coordinators
/// unless the caller shares it here.
#[derive(Clone)]
pub struct NodeContext {
    pub store: Arc<dyn LocalStore>,
    pub channel: Arc<dyn BroadcastChannel>,
}

impl NodeContext {
    pub fn new(store: Arc<dyn LocalStore>, channel: Arc<dyn BroadcastChannel>) -> Self {
        Self { store, channel }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Init,
    Running,
    ShutDown,
}

pub struct CacheCoordinator {
    context: NodeContext,
    config: CoordinatorConfig,
    signals: Arc<AnswerSignals>,
    lifecycle: RwLock<Lifecycle>,
    shutdown: CancellationToken,
    stats: CoordinatorStats,
}

impl CacheCoordinator {
    pub fn new(context: NodeContext, config: CoordinatorConfig) -> Arc<Self> {
        Arc::new(Self {
            context,
            config,
            signals: AnswerSignals::new(),
            lifecycle: RwLock::new(Lifecycle::Init),
            shutdown: CancellationToken::new(),
            stats: CoordinatorStats::default(),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.context.store
    }

    pub fn channel(&self) -> &Arc<dyn BroadcastChannel> {
        &self.context.channel
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read().await
    }

    /// Subscribes to the topic and spawns the delivery loop.
    ///
    /// The subscription exists by the time this returns, so nothing published after
    /// that point is missed.
    pub async fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, CacheError> {
        let mut lifecycle = self.lifecycle.write().await;
        if *lifecycle != Lifecycle::Init {
            return Err(CacheError::CannotStart(*lifecycle));
        }

        let receiver = self.context.channel.subscribe(&self.config.topic);
        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            coordinator.delivery_loop(receiver).await;
        });

        *lifecycle = Lifecycle::Running;
        tracing::info!(
            "Cache coordinator running on topic '{}' (window {:?})",
            self.config.topic,
            self.config.response_window
        );

        Ok(handle)
    }

    /// Stops the delivery loop. Resolves already waiting finish their window normally.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.write().await;
        if *lifecycle == Lifecycle::ShutDown {
            return;
        }
        *lifecycle = Lifecycle::ShutDown;
        self.shutdown.cancel();
        tracing::info!("Cache coordinator shut down");
    }

    async fn delivery_loop(self: Arc<Self>, mut receiver: broadcast::Receiver<Vec<u8>>) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                received = receiver.recv() => match received {
                    Ok(payload) => self.deliver_raw(&payload).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Delivery loop lagged, skipped {} message(s)", skipped);
                        self.stats.record_dropped(skipped);
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Subscription closed, delivery loop exiting");
                        break;
                    }
                },
            }
        }
    }

    /// Decodes and handles one inbound payload. Malformed payloads are dropped.
    pub async fn deliver_raw(&self, payload: &[u8]) {
        match CacheMessage::decode(payload) {
            Ok(Some(message)) => self.deliver(message).await,
            Ok(None) => {
                tracing::debug!("Ignoring message with unknown action");
                self.stats.record_dropped(1);
            }
            Err(e) => {
                tracing::debug!("Dropping malformed message: {}", e);
                self.stats.record_dropped(1);
            }
        }
    }

    pub async fn deliver(&self, message: CacheMessage) {
        if message.key().is_empty() {
            tracing::debug!("Dropping {} message with an empty key", message.action());
            self.stats.record_dropped(1);
            return;
        }

        match message {
            CacheMessage::Query { key } => match self.context.store.get(&key) {
                Ok(Some(value)) => {
                    tracing::debug!("Answering query for {}", key);
                    self.stats.record_answer();
                    self.broadcast(&CacheMessage::Answer { key, value }).await;
                }
                Ok(None) => {
                    tracing::trace!("Query for {} missed locally, staying silent", key);
                }
                Err(e) => {
                    tracing::warn!("Store failure while serving query for {}: {}", key, e);
                }
            },

            CacheMessage::Answer { key, value } => match self.context.store.put(&key, &value) {
                Ok(()) => {
                    tracing::debug!("Absorbed answer for {}", key);
                    self.stats.record_absorbed();
                    self.signals.notify(&key);
                }
                Err(e) => {
                    tracing::warn!("Store failure while absorbing answer for {}: {}", key, e);
                }
            },
        }
    }

    /// Looks `key` up locally, falling back to the mesh on a miss.
    ///
    /// `Ok(None)` means no value turned up within the response window.
    pub async fn resolve(&self, key: &str) -> Result<Option<String>, CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        if let Some(value) = self.lookup(key) {
            tracing::debug!("Cache hit for {}", key);
            self.stats.record_hit();
            return Ok(Some(value));
        }

        self.stats.record_miss();
        if self.lifecycle().await != Lifecycle::Running {
            tracing::debug!("Resolving {} while answers are not being absorbed", key);
        }

        let attempt = ResolutionAttempt::new(key, self.config.response_window);
        let signal = self
            .config
            .early_completion
            .then(|| self.signals.register(key));

        self.stats.record_query();
        self.broadcast(&CacheMessage::Query {
            key: key.to_string(),
        })
        .await;

        let outcome = attempt.wait(signal.as_ref()).await;
        drop(signal);

        let value = self.lookup(key);
        tracing::debug!(
            "Resolved {} after {:?} ({:?}, found: {})",
            attempt.key,
            attempt.elapsed(),
            outcome,
            value.is_some()
        );

        Ok(value)
    }

    /// Runs `resolve` on its own task. Dropping the handle does not cancel it.
    pub fn resolve_detached(
        self: &Arc<Self>,
        key: String,
    ) -> JoinHandle<Result<Option<String>, CacheError>> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.resolve(&key).await })
    }

    /// Writes `key` locally. Never broadcast: peers only learn it by asking.
    pub fn publish(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        self.context.store.put(key, value).map_err(|e| {
            tracing::error!("Failed to store {}: {}", key, e);
            CacheError::Store(e)
        })
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match self.context.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Store failure while resolving {}: {}", key, e);
                None
            }
        }
    }

    /// Best-effort publish. Failures are logged and otherwise ignored.
    async fn broadcast(&self, message: &CacheMessage) {
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to encode {} message: {}", message.action(), e);
                return;
            }
        };

        if let Err(e) = self
            .context
            .channel
            .publish(&self.config.topic, payload)
            .await
        {
            tracing::debug!(
                "Publish of {} for {} failed: {}",
                message.action(),
                message.key(),
                e
            );
        }
    }
}
