//! API error handling.
//!
//! Every failure is returned as a `{ code, message }` JSON body.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::downloader::DownloadError;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DownloadError> for ApiError {
    fn from(err: DownloadError) -> Self {
        let message = err.to_string();
        match err {
            DownloadError::UnresolvableSource { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "UNRESOLVABLE_SOURCE", message)
            }
            DownloadError::NoMatchingStream { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "NO_MATCHING_STREAM", message)
            }
            DownloadError::ResourceGone(_) => Self::new(StatusCode::GONE, "GONE", message),
            DownloadError::OutputCollision(_) => {
                Self::new(StatusCode::CONFLICT, "OUTPUT_COLLISION", message)
            }
            DownloadError::ToolNotFound(_) => {
                tracing::error!("yt-dlp unavailable: {}", message);
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "TOOL_NOT_FOUND", message)
            }
            DownloadError::Timeout(_) => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", message)
            }
            DownloadError::Cancelled => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "CANCELLED", message)
            }
            DownloadError::Io(_) => {
                tracing::error!("IO error: {}", message);
                Self::internal("IO error occurred")
            }
            _ => Self::new(StatusCode::BAD_GATEWAY, "FETCH_ERROR", message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_download_error() {
        let err: ApiError = DownloadError::UnresolvableSource {
            url: "https://x".into(),
            reason: "Unsupported URL".into(),
        }
        .into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "UNRESOLVABLE_SOURCE");
        assert!(err.message.contains("https://x"));
    }

    #[test]
    fn test_io_error_message_is_hidden() {
        let err: ApiError = DownloadError::Io("/secret/path: permission denied".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("/secret"));
    }

    #[test]
    fn test_fetch_errors_are_bad_gateway() {
        let err: ApiError = DownloadError::ParseError("unexpected eof".into()).into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.code, "FETCH_ERROR");
    }
}
