//! services/api/src/error.rs
//!
//! Defines the primary error types for the API service: `ApiError` for
//! startup/infrastructure failures and `AppError` for request-level failures
//! with their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::config::ConfigError;
use meams_core::ports::PortError;

/// The primary error type for the `api` service binary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// A request-level failure, one variant per error kind the API surfaces.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Could not validate credentials")]
    InvalidCredentials,

    #[error("Account has been deactivated")]
    AccountDeactivated,

    #[error("Administrator privileges required")]
    AdminRequired,

    #[error("Current password is incorrect")]
    WrongCurrentPassword,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid identifier format")]
    InvalidIdFormat,

    #[error("{0}")]
    Conflict(String),

    #[error("Upstream store failure")]
    Upstream(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::WrongCurrentPassword => {
                StatusCode::UNAUTHORIZED
            }
            AppError::AccountDeactivated | AppError::AdminRequired => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidIdFormat | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PortError> for AppError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => AppError::NotFound(what),
            PortError::Conflict(what) => AppError::Conflict(what),
            PortError::Unexpected(detail) => AppError::Upstream(detail),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Upstream details stay in the log; clients get a sanitized message.
        if let AppError::Upstream(detail) = &self {
            tracing::error!("store failure: {}", detail);
        }
        let body = Json(json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_error_table() {
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AccountDeactivated.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::AdminRequired.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::NotFound("Supply".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::InvalidIdFormat.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Conflict("Username already exists".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Upstream("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_message_is_sanitized() {
        let err = AppError::Upstream("connection refused at 10.0.0.5".to_string());
        assert_eq!(err.to_string(), "Upstream store failure");
    }
}
