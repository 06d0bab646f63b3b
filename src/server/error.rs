//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`crate::error::Error`] so that route
//! handlers can return `Result<T, ApiError>` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::Error;

/// Wrapper so we can implement `IntoResponse` for the crate error type.
pub struct ApiError {
    inner: Error,
}

impl ApiError {
    pub fn new(inner: Error) -> Self {
        Self { inner }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let code = match &self.inner {
            Error::InvalidIdentifier(_) => "invalid_identifier",
            Error::NotFound { .. } => "not_found",
            Error::Unauthorized(_) => "unauthorized",
            Error::Busy(_) => "busy",
            Error::Upstream(_) => "upstream_error",
            Error::Probe(_) => "probe_error",
            Error::Encode(_) => "encode_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
