use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/health/ready", get(readiness))
}

// Готовность: доступны ли Postgres и Redis
pub async fn readiness(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Database ping failed: {:?}", e);
            false
        }
    };
    let redis = match state.redis.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Redis ping failed: {:?}", e);
            false
        }
    };

    let status = if database && redis {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "database": database, "redis": redis })))
}
