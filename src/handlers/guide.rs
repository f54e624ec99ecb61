use axum::extract::{Query, State};
use axum::http::{HeaderMap, Uri, header};
use axum::response::{IntoResponse, Response};
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{info, warn};

use super::enforce_rate_limit;
use crate::api_response::ApiError;
use crate::fingerprint::fingerprint;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{GuideQuery, LeadType};
use crate::state::AppState;

const ENDPOINT: &str = "guide_download";
const FAILURE: &str = "Failed to download guide. Please try again.";
const DISPOSITION: &str = "attachment; filename=\"Steel-Construction-Automation-Guide.pdf\"";

// Gate: only addresses that already requested the guide get the PDF
pub async fn guide_download_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, ApiError> {
    REQUEST_TOTAL.with_label_values(&[ENDPOINT]).inc();
    let _timer = REQUEST_LATENCY.with_label_values(&[ENDPOINT]).start_timer();

    enforce_rate_limit(&state, &headers, ENDPOINT, state.download_limit).await?;

    let email = Query::<GuideQuery>::try_from_uri(&uri)
        .ok()
        .and_then(|Query(query)| query.email)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Email parameter required".to_string()))?;

    let lead = state
        .store
        .find_lead(&email, LeadType::Guide)
        .await
        .map_err(|e| ApiError::internal(FAILURE, e.context("guide lead lookup")))?;

    if lead.is_none() {
        return Err(ApiError::Forbidden(
            "Please submit your information first to download the guide".to_string(),
        ));
    }

    let pdf = match tokio::fs::read(&state.guide_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %state.guide_path.display(), "guide file missing");
            return Err(ApiError::NotFound(
                "Guide temporarily unavailable. Please try again later.".to_string(),
            ));
        }
        Err(e) => {
            let cause = anyhow::Error::new(e)
                .context(format!("reading {}", state.guide_path.display()));
            return Err(ApiError::internal(FAILURE, cause));
        }
    };

    info!(email = %fingerprint(&email), bytes = pdf.len(), "guide downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, DISPOSITION),
            (header::CACHE_CONTROL, "private, no-cache"),
        ],
        pdf,
    )
        .into_response())
}
