mod contact;
mod guide;
mod health;
mod leads;
mod metrics;
mod newsletter;

pub use contact::contact_handler;
pub use guide::guide_download_handler;
pub use health::health_handler;
pub use leads::leads_handler;
pub use metrics::metrics_handler;
pub use newsletter::newsletter_handler;

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api_response::{ApiError, INVALID_BODY_MESSAGE};
use crate::metrics::RATE_LIMITED_TOTAL;
use crate::rate_limit::{RateLimitConfig, client_identity};
use crate::state::AppState;

// Rate limit check shared by every endpoint
async fn enforce_rate_limit(
    state: &AppState,
    headers: &HeaderMap,
    endpoint: &'static str,
    config: RateLimitConfig,
) -> Result<(), ApiError> {
    let identity = client_identity(headers);

    if state.rate_limiter.is_rate_limited(&identity, config).await {
        RATE_LIMITED_TOTAL.with_label_values(&[endpoint]).inc();
        warn!(endpoint, identity = %identity, "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(())
}

// Parsed after the rate limit check, so a flood of junk still counts
fn parse_body<T: DeserializeOwned>(endpoint: &'static str, body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(endpoint, error = %e, "rejected request body");
        ApiError::BadRequest(INVALID_BODY_MESSAGE.to_string())
    })
}
