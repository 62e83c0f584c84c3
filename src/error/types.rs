use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::middleware::logging::current_request_id;
use crate::models::ErrorResponse;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file provided")]
    MissingFile,

    #[error("No file selected")]
    EmptySelection,

    #[error("Invalid file format: {extension:?} is not an accepted extension")]
    UnsupportedExtension { extension: String },

    #[error("File too large: upload exceeds limit of {limit_mb}MB")]
    PayloadTooLarge { limit_mb: usize },

    #[error("Malformed upload: {message}")]
    InvalidMultipart { message: String },

    #[error("Error reading PDF: {message}")]
    CorruptDocument { message: String },

    #[error("Error processing file: {message}")]
    ExtractionFailed { message: String },

    #[error("Error processing file: extraction returned invalid JSON: {message}")]
    InvalidDelegateOutput { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingFile => "MISSING_FILE",
            AppError::EmptySelection => "EMPTY_SELECTION",
            AppError::UnsupportedExtension { .. } => "UNSUPPORTED_EXTENSION",
            AppError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            AppError::InvalidMultipart { .. } => "INVALID_MULTIPART",
            AppError::CorruptDocument { .. } => "CORRUPT_DOCUMENT",
            AppError::ExtractionFailed { .. } => "EXTRACTION_FAILED",
            AppError::InvalidDelegateOutput { .. } => "INVALID_DELEGATE_OUTPUT",
            AppError::Internal { .. } => "INTERNAL_ERROR",
            AppError::ConfigError { .. } => "CONFIG_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingFile => StatusCode::BAD_REQUEST,
            AppError::EmptySelection => StatusCode::BAD_REQUEST,
            AppError::UnsupportedExtension { .. } => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InvalidMultipart { .. } => StatusCode::BAD_REQUEST,
            AppError::CorruptDocument { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExtractionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidDelegateOutput { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Errors raised before anything reaches scratch storage.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();
        let request_id = current_request_id().unwrap_or_else(|| Uuid::new_v4().to_string());

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
                "Upload rejected"
            );
        }

        let body = Json(ErrorResponse::new(error_code, message, request_id));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

// io::Error's Display carries no path, only the OS message.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl AppError {
    pub fn unsupported_extension(extension: impl Into<String>) -> Self {
        AppError::UnsupportedExtension {
            extension: extension.into(),
        }
    }

    pub fn invalid_multipart(message: impl Into<String>) -> Self {
        AppError::InvalidMultipart {
            message: message.into(),
        }
    }

    pub fn corrupt_document(message: impl Into<String>) -> Self {
        AppError::CorruptDocument {
            message: message.into(),
        }
    }

    pub fn extraction_failed(message: impl Into<String>) -> Self {
        AppError::ExtractionFailed {
            message: message.into(),
        }
    }

    pub fn invalid_delegate_output(message: impl Into<String>) -> Self {
        AppError::InvalidDelegateOutput {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        AppError::ConfigError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal {
            message: message.into(),
        }
    }
}
