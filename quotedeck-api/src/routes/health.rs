//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use quotedeck_services::{CacheStats, CallSerializerStats};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: DateTime<Utc>,
    cache: CacheStats,
    serializer: CallSerializerStats,
    subscriptions: Vec<String>,
}

/// Health check handler
///
/// The gateway degrades rather than fails, so this reports "degraded"
/// rather than an error status when nothing fresh is cached.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let cache = state.market_data.cache_stats();
    let serializer = state.market_data.serializer_stats();
    let subscriptions = state.market_data.active_subscriptions();

    let status = if cache.fresh > 0 { "healthy" } else { "degraded" };

    let response = HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        cache,
        serializer,
        subscriptions,
    };

    (StatusCode::OK, Json(response))
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}
