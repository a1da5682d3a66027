//! Application error types with consistent API responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;

/// Transition guard violations on an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Time-in not recorded for this shift")]
    TimeInMissing,

    #[error("Time-out already recorded for this shift")]
    AlreadyCompleted,

    #[error("Time-in already recorded for this shift")]
    AlreadyTimedIn,
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Selected shift is not available")]
    InvalidShift,

    #[error("No active shift found for the current time")]
    NoActiveShift,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Store unavailable: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code used in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::InvalidShift => "invalid_shift",
            AppError::NoActiveShift => "no_active_shift",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::State(_) => "state_error",
            AppError::Forbidden(_) => "forbidden",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Upstream(_) => "upstream_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::Conflict(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return AppError::NotFound("Referenced user, gym or shift does not exist".into());
            }
        }
        AppError::Upstream(e.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidShift
            | AppError::NoActiveShift
            | AppError::State(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Store error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            other => Some(other.to_string()),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.code().to_string(),
            details,
        })
    }
}

/// Result type alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;
