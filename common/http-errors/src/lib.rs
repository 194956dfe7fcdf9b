use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use uuid::Uuid;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

/// JSON envelope returned for every error response. `error` is the terse,
/// caller-facing message; `code` is stable and mirrors the `X-Error-Code` header.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub trace_id: Option<Uuid>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: &'static str, message: String, trace_id: Option<Uuid> },
    Internal { code: &'static str, message: String, trace_id: Option<Uuid> },
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>, trace_id: Option<Uuid>) -> Self {
        Self::BadRequest { code, message: message.into(), trace_id }
    }

    /// The message is sent to the caller as-is, so it must not carry internal detail.
    pub fn internal(code: &'static str, message: impl Into<String>, trace_id: Option<Uuid>) -> Self {
        Self::Internal { code, message: message.into(), trace_id }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } | ApiError::Internal { code, .. } => *code,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.code();
        let body = match self {
            ApiError::BadRequest { code, message, trace_id }
            | ApiError::Internal { code, message, trace_id } => {
                ErrorBody { error: message, code: code.into(), trace_id }
            }
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}
