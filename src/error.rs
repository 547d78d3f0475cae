use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GateError>;

#[derive(Debug, Clone, Error)]
pub enum GateError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded { limit: u32, retry_after_secs: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for GateError {
    fn from(err: validator::ValidationErrors) -> Self {
        GateError::Validation(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code,
        }
    }

    pub fn from_gate_error(err: &GateError) -> Self {
        match err {
            GateError::InvalidRequest(msg) => Self::new("bad_request", msg, 400),
            GateError::Validation(msg) => Self::new("validation_error", msg, 422),
            GateError::RateLimitExceeded { .. } => {
                Self::new("rate_limit_exceeded", "Request rate limit exceeded", 429)
            }
            GateError::NotFound(msg) => Self::new("not_found", msg, 404),
            GateError::Configuration(msg) => Self::new("configuration_error", msg, 500),
            GateError::Internal(msg) => Self::new("internal_error", msg, 500),
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from_gate_error(&self);
        let status =
            StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let mut resp = (status, Json(body)).into_response();

        if let GateError::RateLimitExceeded {
            limit,
            retry_after_secs,
        } = self
        {
            let headers = resp.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
        }

        resp
    }
}
