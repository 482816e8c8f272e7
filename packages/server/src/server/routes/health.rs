use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AxumAppState;

const CACHE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    cache: CacheHealth,
    sources: usize,
}

#[derive(Serialize)]
pub struct CacheHealth {
    backend: &'static str,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Probes the cache backend with a bounded round trip. Returns 200 OK when
/// the cache answers, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AxumAppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let cache = &state.deps.cache;

    let cache_health = match tokio::time::timeout(CACHE_PROBE_TIMEOUT, cache.ping()).await {
        Ok(Ok(())) => CacheHealth {
            backend: cache.backend_name(),
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => CacheHealth {
            backend: cache.backend_name(),
            status: "error".to_string(),
            error: Some(format!("Ping failed: {}", e)),
        },
        Err(_) => CacheHealth {
            backend: cache.backend_name(),
            status: "error".to_string(),
            error: Some("Ping timeout (>5s)".to_string()),
        },
    };

    let is_healthy = cache_health.status == "ok";

    let overall_status = if is_healthy { "healthy" } else { "unhealthy" };

    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall_status.to_string(),
            cache: cache_health,
            sources: state.deps.jobs.registry().len(),
        }),
    )
}
