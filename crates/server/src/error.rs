//! Unified error handling for the portal API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::mailer::MailError;

/// Application-level error type for the portal API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Malformed or missing request fields. Never retried automatically.
    #[error("{0}")]
    Validation(String),

    /// Resource not found, or not owned by the effective user.
    #[error("{0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Caller lacks permission for this operation.
    #[error("{0}")]
    Forbidden(String),

    /// Outbound email could not be sent for a caller-facing flow.
    #[error("failed to send email: {0}")]
    Mail(#[from] MailError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            Self::Store(StoreError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Mail(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(StoreError::Duplicate(message)) => message.clone(),
            Self::Store(StoreError::NotFound) => "not found".to_owned(),
            Self::Store(_) | Self::Internal(_) => "internal server error".to_owned(),
            Self::Mail(_) => "failed to send email; check SMTP settings".to_owned(),
            other => other.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::NotFound("order".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Unauthorized("no token".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Forbidden("admins only".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_duplicate_key_is_conflict() {
        let err = AppError::Store(StoreError::Duplicate("order id already exists".into()));
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_store_not_found_maps_to_404() {
        assert_eq!(
            status_of(AppError::Store(StoreError::NotFound)),
            StatusCode::NOT_FOUND
        );
    }
}
