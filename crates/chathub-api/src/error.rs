//! Maps domain errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use chathub_core::error::{AppError, ErrorKind};
use chathub_realtime::SyncError;

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Handler error: an [`AppError`] on its way to becoming a response.
#[derive(Debug)]
pub struct ApiError {
    inner: AppError,
    details: Option<serde_json::Value>,
}

impl ApiError {
    /// The wrapped application error.
    pub fn inner(&self) -> &AppError {
        &self.inner
    }

    /// Status code this error renders with.
    pub fn status(&self) -> StatusCode {
        match self.inner.kind {
            ErrorKind::Validation | ErrorKind::UnknownUser => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal | ErrorKind::Configuration | ErrorKind::Serialization => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<AppError> for ApiError {
    fn from(inner: AppError) -> Self {
        Self {
            inner,
            details: None,
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        AppError::from(err).into()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self {
            inner: AppError::validation("Request validation failed"),
            details: serde_json::to_value(&errors).ok(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = match self.inner.kind {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::UnknownUser => "UNKNOWN_USER",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Internal | ErrorKind::Configuration | ErrorKind::Serialization => {
                tracing::error!(error = %self.inner, "Internal server error");
                "INTERNAL_ERROR"
            }
        };

        let body = ApiErrorResponse {
            error: error_code.to_string(),
            message: self.inner.message,
            details: self.details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chathub_core::types::UserId;

    #[test]
    fn test_sync_errors_map_to_client_statuses() {
        let invalid = ApiError::from(SyncError::InvalidMessage("message is empty".into()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let unknown = ApiError::from(SyncError::UnknownUser("name 'zed'".into()));
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
        assert_eq!(unknown.inner().kind, ErrorKind::UnknownUser);

        let taken = ApiError::from(SyncError::NameTaken {
            name: "alice".into(),
            owner: UserId(1),
        });
        assert_eq!(taken.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_internal_errors_are_500() {
        let err = ApiError::from(AppError::internal("boom"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
