use clap::Parser;
use p2p_cache::cache::coordinator::{CacheCoordinator, NodeContext};
use p2p_cache::cache::handlers::router;
use p2p_cache::config::NodeArgs;
use p2p_cache::mesh::BroadcastChannel;
use p2p_cache::mesh::service::GossipMesh;
use p2p_cache::store::LocalStore;
use p2p_cache::store::memory::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const STATS_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = NodeArgs::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(args.log_level.to_lowercase()))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let shutdown = CancellationToken::new();

    // 1. Mesh (UDP broadcast channel):
    let mesh = GossipMesh::bind(args.mesh_config()).await?;
    mesh.start(shutdown.clone());

    // 2. Store and coordinator:
    let store = Arc::new(MemoryStore::new());
    let coordinator = CacheCoordinator::new(
        NodeContext::new(store.clone(), mesh.clone()),
        args.coordinator_config(),
    );
    let delivery = coordinator.start().await?;

    // 3. Stats reporter:
    {
        let mesh = mesh.clone();
        let coordinator = coordinator.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(STATS_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let stats = coordinator.stats();
                        tracing::info!(
                            "Stats: {} entries, {} live peer(s), {} hits, {} misses, {} answers absorbed",
                            store.len(),
                            mesh.peer_count(),
                            stats.hits,
                            stats.misses,
                            stats.answers_absorbed
                        );
                    }
                }
            }
        });
    }

    // 4. HTTP front end:
    let app = router(coordinator.clone());
    let listener = tokio::net::TcpListener::bind(args.http_addr).await?;

    tracing::info!(
        "Node running with peer id {} (mesh {}, HTTP http://{}). Press CTRL+C to stop.",
        mesh.local_id,
        mesh.local_addr()?,
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    tracing::info!("Shutting down");
    coordinator.shutdown().await;
    shutdown.cancel();
    delivery.await?;

    Ok(())
}
