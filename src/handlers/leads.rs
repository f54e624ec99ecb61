use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;
use tracing::{debug, info};

use super::{enforce_rate_limit, parse_body};
use crate::api_response::{ApiError, ApiResponse, success};
use crate::fingerprint::fingerprint;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL, SUBMISSIONS_TOTAL};
use crate::models::{LeadPayload, RecordId};
use crate::state::AppState;
use crate::validation::validate_lead;

const ENDPOINT: &str = "leads";
const FAILURE: &str = "Failed to submit lead. Please try again.";

pub async fn leads_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<RecordId>>, ApiError> {
    REQUEST_TOTAL.with_label_values(&[ENDPOINT]).inc();
    let _timer = REQUEST_LATENCY.with_label_values(&[ENDPOINT]).start_timer();

    enforce_rate_limit(&state, &headers, ENDPOINT, state.form_limit).await?;

    let payload: LeadPayload = parse_body(ENDPOINT, &body)?;
    let lead = validate_lead(payload).inspect_err(|e| {
        debug!(endpoint = ENDPOINT, field = e.field, "validation failed");
    })?;

    let lead = state
        .store
        .create_lead(lead)
        .await
        .map_err(|e| ApiError::internal(FAILURE, e.context("lead submission")))?;

    SUBMISSIONS_TOTAL
        .with_label_values(&[lead.lead_type.as_str()])
        .inc();
    info!(
        id = %lead.id,
        lead_type = %lead.lead_type,
        email = %fingerprint(&lead.email),
        "lead saved"
    );

    Ok(success(
        RecordId { id: lead.id },
        "Thank you for your interest! We'll contact you within 24 hours.",
    ))
}
