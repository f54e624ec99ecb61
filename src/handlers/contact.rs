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
use crate::models::{ContactPayload, RecordId};
use crate::state::AppState;
use crate::validation::validate_contact;

const ENDPOINT: &str = "contact";
const FAILURE: &str = "Failed to send message. Please try again.";

pub async fn contact_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<RecordId>>, ApiError> {
    REQUEST_TOTAL.with_label_values(&[ENDPOINT]).inc();
    let _timer = REQUEST_LATENCY.with_label_values(&[ENDPOINT]).start_timer();

    enforce_rate_limit(&state, &headers, ENDPOINT, state.form_limit).await?;

    let payload: ContactPayload = parse_body(ENDPOINT, &body)?;
    let contact = validate_contact(payload).inspect_err(|e| {
        debug!(endpoint = ENDPOINT, field = e.field, "validation failed");
    })?;

    let contact = state
        .store
        .create_contact(contact)
        .await
        .map_err(|e| ApiError::internal(FAILURE, e.context("contact submission")))?;

    SUBMISSIONS_TOTAL.with_label_values(&["contact"]).inc();
    info!(id = %contact.id, email = %fingerprint(&contact.email), "contact saved");

    Ok(success(
        RecordId { id: contact.id },
        "Message sent successfully! We'll get back to you soon.",
    ))
}
