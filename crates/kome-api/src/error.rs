//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`DisputeError`] to HTTP status codes and JSON error bodies.
//! Storage and upstream failures are logged in full and returned to the
//! client as a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kome_dispute::DisputeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "INVALID_STATE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The caller may not perform this action (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The dispute or order is in the wrong status for this action (409).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Duplicate resource or duplicate vote (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// The marketplace API failed or is unreachable (502).
    #[error("upstream marketplace error: {0}")]
    UpstreamError(String),

    /// Feature disabled by configuration (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::UpstreamError(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal/upstream error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::UpstreamError(_) => "The marketplace service is unavailable".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::UpstreamError(_) => tracing::error!(error = %self, "upstream marketplace error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DisputeError> for AppError {
    fn from(err: DisputeError) -> Self {
        match &err {
            DisputeError::DisputeNotFound(_) | DisputeError::OrderNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            DisputeError::InvalidState { .. } | DisputeError::OrderNotDisputable { .. } => {
                Self::InvalidState(err.to_string())
            }
            DisputeError::UnauthorizedParty { .. } => Self::Forbidden(err.to_string()),
            DisputeError::Validation(e) => Self::Validation(e.to_string()),
            DisputeError::DuplicateDispute { .. } | DisputeError::AlreadyVoted { .. } => {
                Self::Conflict(err.to_string())
            }
            DisputeError::Storage(_) => Self::Internal(err.to_string()),
            DisputeError::Directory(_) => Self::UpstreamError(err.to_string()),
        }
    }
}

impl From<kome_core::ValidationError> for AppError {
    fn from(err: kome_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use kome_core::{DisputeId, OrderId, UserId, ValidationError};
    use kome_dispute::{DirectoryError, DisputeStatus, OrderStatus};

    fn status_of(err: DisputeError) -> StatusCode {
        AppError::from(err).status_and_code().0
    }

    #[test]
    fn dispute_errors_map_to_statuses() {
        assert_eq!(
            status_of(DisputeError::DisputeNotFound(DisputeId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DisputeError::OrderNotFound(OrderId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DisputeError::InvalidState {
                dispute_id: DisputeId::new(),
                status: DisputeStatus::Resolved,
                operation: "vote on",
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DisputeError::OrderNotDisputable {
                order_id: OrderId::new(),
                status: OrderStatus::Paid,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DisputeError::UnauthorizedParty {
                user_id: UserId::new(),
                action: "vote on their own dispute",
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ValidationError::Empty { field: "message" }.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(DisputeError::AlreadyVoted {
                dispute_id: DisputeId::new(),
                juror_id: UserId::new(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DisputeError::Storage("pool timed out".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(DirectoryError("connection refused".into()).into()),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn internal_message_not_exposed() {
        let resp = AppError::Internal("password authentication failed for user kome".into())
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(!body.error.message.contains("password"));
    }

    #[tokio::test]
    async fn client_error_carries_message() {
        let resp = AppError::from(DisputeError::InvalidState {
            dispute_id: DisputeId::new(),
            status: DisputeStatus::InJury,
            operation: "post a message to",
        })
        .into_response();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "INVALID_STATE");
        assert!(body.error.message.contains("in_jury"));
    }
}
