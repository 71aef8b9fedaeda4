//! Error types for the MCollection server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Whether the process runs in production; set once at startup from config.
/// Gates cause details in error bodies at runtime rather than build time,
/// so a release binary outside production still reports causes.
static PRODUCTION: AtomicBool = AtomicBool::new(false);

pub fn set_production_mode(enabled: bool) {
    PRODUCTION.store(enabled, Ordering::Relaxed);
}

fn production_mode() -> bool {
    PRODUCTION.load(Ordering::Relaxed)
}

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed required parameter.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Business-rule violation (attachment limits, unresolved references).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Cloud storage operation failed; wraps the provider cause.
    #[error("Upload failed: {0}")]
    UploadFailure(String),

    /// Export engine (browser/DOCX conversion) failed; wraps the cause.
    #[error("Export failed: {0}")]
    ExportFailure(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UploadFailure(_)
            | AppError::ExportFailure(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Cause details for the response body: server faults only, and never
    /// in production.
    fn details(&self, production: bool) -> Option<String> {
        if !production && self.status_code().is_server_error() {
            Some(self.to_string())
        } else {
            None
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_failed",
            AppError::UploadFailure(_) => "upload_failed",
            AppError::ExportFailure(_) => "export_failed",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server faults are logged here; 4xx responses carry their own
        // message and stay quiet in the logs.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            match &self {
                AppError::UploadFailure(msg) => format!("Upload failed: {}", msg),
                AppError::ExportFailure(msg) => format!("Export failed: {}", msg),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        let details = self.details(production_mode());

        let body = Json(ErrorResponse {
            error: self.error_type().to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::ExportFailure("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::UploadFailure("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_details_follow_runtime_production_flag() {
        let err = AppError::ExportFailure("browser died".into());
        assert_eq!(
            err.details(false).as_deref(),
            Some("Export failed: browser died")
        );
        assert_eq!(err.details(true), None);
    }

    #[test]
    fn test_client_errors_carry_no_details() {
        let err = AppError::NotFound("document x".into());
        assert_eq!(err.details(false), None);
        assert_eq!(err.details(true), None);
    }
}
