use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{db::retry, forms::ValidationErrors, game::GuessError};

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";
pub const BUSY_MESSAGE: &str = "Database is busy. Please try again later.";

/// Error returned by every handler
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("authentication required")]
    Unauthorized,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    /// Body, path or query string that could not be decoded
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    /// Transient database errors persisted through every retry
    #[error("database is busy")]
    Busy,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<ValidationErrors>,
}

impl AppError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Rejected { status, .. } => *status,
            AppError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_failed",
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Rejected { .. } => "invalid_request",
            AppError::Busy => "busy",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether retrying the whole operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Database(e) if retry::is_transient(e))
    }

    /// Unique constraint violations become a conflict, anything else passes through
    pub fn on_unique_violation(self, message: &str) -> Self {
        match self {
            AppError::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
                AppError::conflict(message)
            }
            other => other,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<GuessError> for AppError {
    fn from(err: GuessError) -> Self {
        match err {
            GuessError::GameFinished => AppError::conflict(err.to_string()),
            GuessError::OutOfRange { .. } => {
                AppError::Validation(ValidationErrors::single("guess", err.to_string()))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let (message, fields) = match self {
            AppError::Validation(errors) => ("Please correct the errors below".to_string(), Some(errors)),
            AppError::Busy => (BUSY_MESSAGE.to_string(), None),
            AppError::InvalidCredentials => ("Invalid email or password".to_string(), None),
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (GENERIC_FAILURE_MESSAGE.to_string(), None)
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:#}", e);
                (GENERIC_FAILURE_MESSAGE.to_string(), None)
            }
            ref other => (other.to_string(), None),
        };
        let body = ErrorBody {
            error: code,
            message,
            fields,
        };

        (status, Json(body)).into_response()
    }
}
