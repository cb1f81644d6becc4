use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::format_size;

pub type AppResult<T> = Result<T, AppError>;

fn display_size(size_bytes: &usize) -> String {
    format_size(*size_bytes)
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("File too large: {} exceeds limit of {limit}MB", display_size(.size_bytes))]
    FileTooLarge { size_bytes: usize, limit: usize },

    #[error("Request body exceeds limit of {limit}MB")]
    RequestTooLarge { limit: usize },

    #[error("Invalid file format: {message}")]
    InvalidFile { message: String },

    #[error("Unable to read PDF: {message}")]
    UnreadablePdf { message: String },

    #[error("No pages matched the requested range")]
    NoPagesSelected,

    #[error("At least {required} PDF files are required, got {received}")]
    NotEnoughFiles { required: usize, received: usize },

    #[error("Rate limit exceeded: maximum concurrent requests reached")]
    RateLimitExceeded,

    #[error("PDF processing failed: {message}")]
    ProcessingError { message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AppError::RequestTooLarge { .. } => "REQUEST_TOO_LARGE",
            AppError::InvalidFile { .. } => "INVALID_FILE",
            AppError::UnreadablePdf { .. } => "UNREADABLE_PDF",
            AppError::NoPagesSelected => "NO_PAGES_SELECTED",
            AppError::NotEnoughFiles { .. } => "NOT_ENOUGH_FILES",
            AppError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            AppError::ProcessingError { .. } => "PROCESSING_ERROR",
            AppError::Timeout => "REQUEST_TIMEOUT",
            AppError::Internal { .. } => "INTERNAL_ERROR",
            AppError::MissingFile => "MISSING_FILE",
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RequestTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InvalidFile { .. } => StatusCode::BAD_REQUEST,
            AppError::UnreadablePdf { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NoPagesSelected => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotEnoughFiles { .. } => StatusCode::BAD_REQUEST,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::ProcessingError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MissingFile => StatusCode::BAD_REQUEST,
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();
        let request_id = Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now().to_rfc3339();

        if status.is_server_error() {
            tracing::error!(
                error_code = error_code,
                status_code = %status,
                request_id = %request_id,
                error_message = %message,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                error_code = error_code,
                status_code = %status,
                request_id = %request_id,
                error_message = %message,
                "Request rejected"
            );
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
                "request_id": request_id,
                "timestamp": timestamp
            },
            "data": null
        }));

        (status, body).into_response()
    }
}

// Convert common errors to AppError
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout
    }
}

impl From<lopdf::Error> for AppError {
    fn from(err: lopdf::Error) -> Self {
        AppError::UnreadablePdf {
            message: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::ProcessingError {
            message: format!("Archive error: {}", err),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal {
            message: format!("Worker task failed: {}", err),
        }
    }
}

// Helper methods for creating specific errors
impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        AppError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn unreadable(message: impl Into<String>) -> Self {
        AppError::UnreadablePdf {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal {
            message: message.into(),
        }
    }
}
