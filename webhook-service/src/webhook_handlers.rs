use std::time::Instant;

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{WebhookError, WebhookResult};
use crate::normalizer::normalize;
use crate::provider::Provider;
use crate::verifier::{scheme_for, verify};
use crate::AppState;

#[derive(Serialize)]
pub struct WebhookAck {
    pub success: bool,
}

/// Verify, parse and dispatch one delivery. Stops at the first failing stage,
/// so nothing is parsed or dispatched unless the signature checked out.
pub async fn process_delivery(
    state: &AppState,
    provider: Provider,
    headers: &HeaderMap,
    body: &[u8],
) -> WebhookResult<()> {
    let secret = state
        .config
        .secret_for(provider)
        .ok_or_else(|| WebhookError::Internal(format!("{provider} webhook secret not configured")))?;
    let verified = verify(scheme_for(provider), headers, body, secret)?;
    let event = normalize(verified)?;
    debug!(event_type = event.event_type().unwrap_or("unknown"), "Webhook payload parsed");
    state.dispatcher.dispatch(&event).await
}

async fn receive(
    state: AppState,
    provider: Provider,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let delivery_id = Uuid::new_v4();
    let span = info_span!("webhook_delivery", provider = %provider, %delivery_id);
    async move {
        let started = Instant::now();
        let body = match body {
            Ok(body) => body,
            Err(rejection) => {
                let outcome = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    "payload_too_large"
                } else {
                    "unreadable_body"
                };
                state
                    .metrics
                    .record_delivery(provider.as_str(), outcome, started.elapsed().as_secs_f64());
                warn!(error_kind = outcome, error = %rejection, "Webhook body rejected");
                return rejection.into_response();
            }
        };
        let result = process_delivery(&state, provider, &headers, &body).await;
        let outcome = match &result {
            Ok(()) => "succeeded",
            Err(err) => err.kind(),
        };
        state
            .metrics
            .record_delivery(provider.as_str(), outcome, started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                info!("Webhook processed");
                (StatusCode::OK, Json(WebhookAck { success: true })).into_response()
            }
            Err(err) => {
                if err.is_client_error() {
                    warn!(error_kind = err.kind(), error = %err, "Webhook rejected");
                } else {
                    error!(error_kind = err.kind(), error = %err, "Webhook processing failed");
                }
                err.into_api_error(Some(delivery_id)).into_response()
            }
        }
    }
    .instrument(span)
    .await
}

pub async fn handle_cashfree_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    receive(state, Provider::Cashfree, headers, body).await
}

pub async fn handle_razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    receive(state, Provider::Razorpay, headers, body).await
}
