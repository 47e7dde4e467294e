//! API error types and JSON response formatting.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::CacheError;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details in the response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that converts to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Nothing cached under `key`; the caller should use its backing store.
    pub fn cache_miss(key: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "CACHE_MISS",
            format!("No cached value for '{}'", key),
        )
        .with_details(serde_json::json!({ "key": key }))
    }

    /// The health gate refused the operation.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "CACHE_UNAVAILABLE", reason)
    }

    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_KEY", message)
    }

    /// The store accepted none or only part of a write.
    pub fn write_failed(key: &str, skipped: &[String]) -> Self {
        let details = if skipped.is_empty() {
            serde_json::json!({ "key": key })
        } else {
            serde_json::json!({ "key": key, "skipped": skipped })
        };
        Self::new(
            StatusCode::BAD_GATEWAY,
            "CACHE_WRITE_FAILED",
            format!("Failed to cache '{}'", key),
        )
        .with_details(details)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log server errors at error level, client errors at debug level
        if self.status.is_server_error() {
            error!(
                status = %self.status.as_u16(),
                code = %self.code,
                message = %self.message,
                "server error response"
            );
        } else if self.status.is_client_error() {
            debug!(
                status = %self.status.as_u16(),
                code = %self.code,
                message = %self.message,
                "client error response"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        if err.is_unavailable() {
            Self::unavailable(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}
