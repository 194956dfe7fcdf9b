use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use thiserror::Error;
use uuid::Uuid;

use crate::provider::Provider;

pub type WebhookResult<T> = Result<T, WebhookError>;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("{0} webhook signature headers missing")]
    MissingCredentials(Provider),
    #[error("webhook signature mismatch")]
    InvalidSignature,
    #[error("webhook payload is not valid JSON: {0}")]
    MalformedPayload(String),
    #[error("no webhook handler configured for provider '{0}'")]
    UnsupportedProvider(String),
    #[error("webhook handler failed: {0}")]
    HandlerFailure(String),
    #[error("internal webhook error: {0}")]
    Internal(String),
}

impl WebhookError {
    /// Stable identifier used for log fields, metric labels and `X-Error-Code`.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookError::MissingCredentials(_) => "missing_credentials",
            WebhookError::InvalidSignature => "invalid_signature",
            WebhookError::MalformedPayload(_) => "malformed_payload",
            WebhookError::UnsupportedProvider(_) => "unsupported_provider",
            WebhookError::HandlerFailure(_) => "handler_failure",
            WebhookError::Internal(_) => "internal_error",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingCredentials(_)
                | WebhookError::InvalidSignature
                | WebhookError::MalformedPayload(_)
        )
    }

    /// Maps to the terse response sent back to the provider. Handler and
    /// internal messages stay server-side.
    pub fn into_api_error(self, trace_id: Option<Uuid>) -> ApiError {
        let code = self.kind();
        match self {
            WebhookError::MissingCredentials(Provider::Cashfree) => {
                ApiError::bad_request(code, "Missing signature or timestamp", trace_id)
            }
            WebhookError::MissingCredentials(Provider::Razorpay) => {
                ApiError::bad_request(code, "Missing signature", trace_id)
            }
            WebhookError::InvalidSignature => ApiError::bad_request(code, "Invalid signature", trace_id),
            WebhookError::MalformedPayload(_) => {
                ApiError::bad_request(code, "Invalid JSON payload", trace_id)
            }
            WebhookError::UnsupportedProvider(_)
            | WebhookError::HandlerFailure(_)
            | WebhookError::Internal(_) => {
                ApiError::internal(code, "Webhook processing failed", trace_id)
            }
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        self.into_api_error(None).into_response()
    }
}
