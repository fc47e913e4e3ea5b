use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::middleware::logging::current_request_id;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing {field}")]
    MissingField { field: &'static str },

    #[error("No file part")]
    NoFilePart,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("Only .epub allowed")]
    InvalidFileType,

    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("Invalid chapter index")]
    InvalidChapterIndex,

    #[error("File not found: {filename}")]
    FileNotFound { filename: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Upload too large: {message}")]
    PayloadTooLarge { message: String },

    /// Carries the underlying parser message verbatim.
    #[error("{message}")]
    ProcessingError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingField { .. } => "MISSING_FIELD",
            AppError::NoFilePart => "NO_FILE_PART",
            AppError::NoSelectedFile => "NO_SELECTED_FILE",
            AppError::InvalidFileType => "INVALID_FILE_TYPE",
            AppError::InvalidPath { .. } => "INVALID_PATH",
            AppError::InvalidChapterIndex => "INVALID_CHAPTER_INDEX",
            AppError::FileNotFound { .. } => "FILE_NOT_FOUND",
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            AppError::ProcessingError { .. } => "PROCESSING_ERROR",
            AppError::StorageError { .. } => "STORAGE_ERROR",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingField { .. } => StatusCode::BAD_REQUEST,
            AppError::NoFilePart => StatusCode::BAD_REQUEST,
            AppError::NoSelectedFile => StatusCode::BAD_REQUEST,
            AppError::InvalidFileType => StatusCode::BAD_REQUEST,
            AppError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidChapterIndex => StatusCode::BAD_REQUEST,
            AppError::FileNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ProcessingError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StorageError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();
        let request_id = current_request_id().unwrap_or_else(|| Uuid::new_v4().to_string());
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

        // `error` stays a plain string so reader clients can show it as-is.
        let body = Json(json!({
            "error": message,
            "code": error_code,
            "request_id": request_id,
            "timestamp": timestamp
        }));

        (status, body).into_response()
    }
}

// Convert common errors to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError {
            message: format!("JSON parsing error: {}", err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError {
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge {
                message: err.body_text(),
            }
        } else {
            AppError::ValidationError {
                message: format!("Failed to read multipart form: {}", err.body_text()),
            }
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal {
            message: format!("Background task failed: {}", err),
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

    pub fn storage(message: impl Into<String>) -> Self {
        AppError::StorageError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal {
            message: message.into(),
        }
    }

    pub fn not_found(filename: impl Into<String>) -> Self {
        AppError::FileNotFound {
            filename: filename.into(),
        }
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        AppError::InvalidPath {
            path: path.into(),
        }
    }
}
