use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use common_http_errors::ApiError;
use common_observability::TEXT_CONTENT_TYPE;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::webhook_handlers::{handle_cashfree_webhook, handle_razorpay_webhook};
use crate::AppState;

async fn health() -> &'static str {
    "ok"
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE))],
            buffer,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            ApiError::internal("metrics_unavailable", "Metrics unavailable", None).into_response()
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.body_limit_bytes;
    let webhooks = Router::new()
        .route("/webhooks/cashfree", post(handle_cashfree_webhook))
        .route("/webhooks/razorpay", post(handle_razorpay_webhook))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(render_metrics))
        .merge(webhooks)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
