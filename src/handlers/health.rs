use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;
use tracing::warn;

use crate::state::AppState;

// healthy only while the lead store answers
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match state.store.count_leads().await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "database": "ok",
                "timestamp": timestamp
            })),
        ),
        Err(e) => {
            warn!(error = ?e, "health check failed to reach lead store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "database": "unavailable",
                    "timestamp": timestamp
                })),
            )
        }
    }
}
