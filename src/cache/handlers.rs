use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

use super::coordinator::CacheCoordinator;
use super::protocol::{
    ENDPOINT_CACHE, ENDPOINT_STATS, EntryResponse, ErrorResponse, MessageResponse, SetRequest,
    StatsResponse,
};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Routes of the cache front end, bound to `coordinator`.
pub fn router(coordinator: Arc<CacheCoordinator>) -> Router {
    Router::new()
        .route(&format!("{}/:key", ENDPOINT_CACHE), get(handle_fetch))
        .route(ENDPOINT_CACHE, post(handle_store))
        .route(ENDPOINT_STATS, get(handle_stats))
        .layer(Extension(coordinator))
}

/// Resolution runs on its own task, so a client hanging up mid-window does not stop
/// the node from filling its store.
pub async fn handle_fetch(
    Extension(coordinator): Extension<Arc<CacheCoordinator>>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>, ApiError> {
    match coordinator.resolve_detached(key.clone()).await {
        Ok(Ok(Some(value))) if !value.is_empty() => Ok(Json(EntryResponse { key, value })),
        Ok(Ok(_)) => Err(api_error(StatusCode::NOT_FOUND, "Key not found")),
        Ok(Err(e)) if e.is_client_error() => {
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Ok(Err(e)) => {
            tracing::error!("Failed to resolve {}: {}", key, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => {
            tracing::error!("Resolve task for {} failed: {}", key, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub async fn handle_store(
    Extension(coordinator): Extension<Arc<CacheCoordinator>>,
    payload: Result<Json<SetRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => {
            tracing::debug!("Rejected write body: {}", e);
            SetRequest::default()
        }
    };

    let (key, value) = match (req.key, req.value) {
        (Some(key), Some(value)) if !key.is_empty() && !value.is_empty() => (key, value),
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Both key and value are required",
            ));
        }
    };

    match coordinator.publish(&key, &value) {
        Ok(()) => Ok(Json(MessageResponse {
            message: "Value set successfully".to_string(),
        })),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

pub async fn handle_stats(
    Extension(coordinator): Extension<Arc<CacheCoordinator>>,
) -> Json<StatsResponse> {
    Json(StatsResponse {
        entries: coordinator.store().len(),
        peers: coordinator.channel().peer_count(),
        response_window_ms: u64::try_from(coordinator.config().response_window.as_millis())
            .unwrap_or(u64::MAX),
        counters: coordinator.stats(),
    })
}
