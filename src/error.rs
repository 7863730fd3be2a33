//! Domain error types for the scan server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Upload has an unsupported extension; rejected before any pipeline work
    #[error("Unsupported file type: {0}. Only APK, Java, or JAR files are supported")]
    UnsupportedInput(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Scan exists but its result is not available yet
    #[error("Scan result not available yet")]
    ResultPending,

    /// Requested report format was never generated for this scan
    #[error("Report format '{0}' not available")]
    FormatUnavailable(String),

    /// Registered report file is missing from storage
    #[error("Report file missing from storage: {0}")]
    FileMissing(String),

    /// Operation conflicts with the scan's current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A pipeline collaborator (decompiler, scanner, report writer) failed
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Filesystem operation failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            AppError::NotFound(_)
            | AppError::ResultPending
            | AppError::FormatUnavailable(_)
            | AppError::FileMissing(_) => StatusCode::NOT_FOUND,
            AppError::UnsupportedInput(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Pipeline(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (status, error_code, response_message) = match self {
            AppError::NotFound(_) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                self.to_string(),
            ),
            AppError::UnsupportedInput(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "UNSUPPORTED_INPUT_TYPE",
                self.to_string(),
            ),
            AppError::InvalidInput(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                self.to_string(),
            ),
            AppError::ResultPending => (
                actix_web::http::StatusCode::NOT_FOUND,
                "RESULT_PENDING",
                self.to_string(),
            ),
            AppError::FormatUnavailable(_) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "FORMAT_UNAVAILABLE",
                self.to_string(),
            ),
            AppError::FileMissing(_) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "FILE_MISSING",
                self.to_string(),
            ),
            AppError::Conflict(_) => (
                actix_web::http::StatusCode::CONFLICT,
                "CONFLICT",
                self.to_string(),
            ),
            AppError::Pipeline(err_str) => {
                tracing::error!("Pipeline error: {}", err_str);
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "PIPELINE_ERROR",
                    "An internal pipeline error occurred".to_string(),
                )
            }
            AppError::Storage(err_str) => {
                tracing::error!("Storage error: {}", err_str);
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "An internal storage error occurred".to_string(),
                )
            }
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code.to_string(),
            message: response_message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Pipeline(format!("JSON serialization error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("Invalid UUID: {}", err))
    }
}
