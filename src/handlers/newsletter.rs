use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;
use tracing::info;

use super::{enforce_rate_limit, parse_body};
use crate::api_response::{ApiError, ApiResponse, success};
use crate::fingerprint::fingerprint;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL, SUBMISSIONS_TOTAL};
use crate::models::{LeadType, NewsletterPayload, NewsletterSignup, Subscription};
use crate::state::AppState;
use crate::validation::validate_newsletter;

const ENDPOINT: &str = "newsletter";
const FAILURE: &str = "Failed to subscribe. Please try again.";

pub async fn newsletter_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<Subscription>>, ApiError> {
    REQUEST_TOTAL.with_label_values(&[ENDPOINT]).inc();
    let _timer = REQUEST_LATENCY.with_label_values(&[ENDPOINT]).start_timer();

    enforce_rate_limit(&state, &headers, ENDPOINT, state.form_limit).await?;

    let payload: NewsletterPayload = parse_body(ENDPOINT, &body)?;
    let email = validate_newsletter(payload)?;

    // one subscription per address
    let signup = state
        .store
        .subscribe_newsletter(&email)
        .await
        .map_err(|e| ApiError::internal(FAILURE, e.context("newsletter signup")))?;

    let lead = match signup {
        NewsletterSignup::Created(lead) => lead,
        NewsletterSignup::AlreadySubscribed => {
            info!(email = %fingerprint(&email), "already subscribed");
            return Ok(success(
                Subscription::Existing {
                    already_subscribed: true,
                },
                "You're already subscribed to our newsletter!",
            ));
        }
    };

    SUBMISSIONS_TOTAL
        .with_label_values(&[LeadType::Newsletter.as_str()])
        .inc();
    info!(id = %lead.id, email = %fingerprint(&lead.email), "newsletter subscriber added");

    Ok(success(
        Subscription::Created { id: lead.id },
        "Successfully subscribed to newsletter!",
    ))
}
