//! Health check handler.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use storyhub_core::traits::CacheProvider;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = match state.cache.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            warn!(error = %e, "Cache health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if cache { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache,
    })
}
