//! HTTP front end tests.
//!
//! Runs real cache nodes wired through an in-process hub, each serving its own
//! router on a loopback socket, and drives them with an HTTP client.

use p2p_cache::cache::coordinator::{CacheCoordinator, CoordinatorConfig, NodeContext};
use p2p_cache::cache::handlers::router;
use p2p_cache::cache::protocol::{EntryResponse, ErrorResponse, MessageResponse, StatsResponse};
use p2p_cache::mesh::local::LocalHub;
use p2p_cache::store::LocalStore;
use p2p_cache::store::memory::MemoryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const WINDOW: Duration = Duration::from_millis(200);

async fn spawn_node(hub: &Arc<LocalHub>) -> SocketAddr {
    spawn_node_with_store(hub).await.0
}

async fn spawn_node_with_store(hub: &Arc<LocalHub>) -> (SocketAddr, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let coordinator = CacheCoordinator::new(
        NodeContext::new(store.clone(), hub.join(false)),
        CoordinatorConfig {
            response_window: WINDOW,
            ..CoordinatorConfig::default()
        },
    );
    coordinator.start().await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(coordinator)).await.unwrap();
    });
    (addr, store)
}

#[tokio::test]
async fn test_value_written_on_one_node_is_fetched_from_another() {
    let hub = LocalHub::new();
    let node_a = spawn_node(&hub).await;
    let node_b = spawn_node(&hub).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/cache", node_b))
        .json(&serde_json::json!({ "key": "greeting", "value": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: MessageResponse = response.json().await.unwrap();
    assert_eq!(body.message, "Value set successfully");

    let response = client
        .get(format!("http://{}/cache/greeting", node_a))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let entry: EntryResponse = response.json().await.unwrap();
    assert_eq!(entry.key, "greeting");
    assert_eq!(entry.value, "hello");

    let stats: StatsResponse = client
        .get(format!("http://{}/stats", node_a))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.peers, 1);
    assert_eq!(stats.counters.misses, 1);
    assert_eq!(stats.response_window_ms, 200);
}

#[tokio::test]
async fn test_unknown_key_is_404_after_window() {
    let hub = LocalHub::new();
    let node = spawn_node(&hub).await;

    let started = std::time::Instant::now();
    let response = reqwest::get(format!("http://{}/cache/missing", node))
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    assert!(started.elapsed() >= WINDOW);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error, "Key not found");
}

#[tokio::test]
async fn test_write_requires_key_and_value() {
    let hub = LocalHub::new();
    let node = spawn_node(&hub).await;
    let client = reqwest::Client::new();

    for body in [
        serde_json::json!({ "key": "only-key" }),
        serde_json::json!({ "value": "only-value" }),
        serde_json::json!({ "key": "", "value": "empty-key" }),
    ] {
        let response = client
            .post(format!("http://{}/cache", node))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "Body {} should be rejected", body);
        let error: ErrorResponse = response.json().await.unwrap();
        assert_eq!(error.error, "Both key and value are required");
    }

    let response = client
        .post(format!("http://{}/cache", node))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_empty_stored_value_reads_as_not_found() {
    let hub = LocalHub::new();
    let (node, store) = spawn_node_with_store(&hub).await;
    store.put("blank", "").unwrap();

    let response = reqwest::get(format!("http://{}/cache/blank", node))
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error, "Key not found");
}
