pub mod api_response;
pub mod config;
pub mod fingerprint;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod validation;

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    contact_handler, guide_download_handler, health_handler, leads_handler, metrics_handler,
    newsletter_handler,
};
use crate::state::AppState;

// creating the router with routes, anything else falls through to static assets
pub fn router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.public_dir);

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/contact", post(contact_handler))
        .route("/api/leads", post(leads_handler))
        .route("/api/newsletter", post(newsletter_handler))
        .route("/api/guide/download", get(guide_download_handler))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
