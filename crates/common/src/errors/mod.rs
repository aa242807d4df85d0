//! Error types for the Linkstash services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidUrl,

    // Authentication errors (2xxx)
    AuthRequired,
    Unauthorized,
    InvalidOtp,
    ExpiredToken,

    // Resource errors (4xxx)
    NotFound,
    DocumentNotFound,

    // External service errors (8xxx)
    ExtractionError,
    UploadError,
    RemoteQueryError,
    ChatError,
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidUrl => 1003,

            // Auth (2xxx)
            ErrorCode::AuthRequired => 2001,
            ErrorCode::Unauthorized => 2002,
            ErrorCode::InvalidOtp => 2003,
            ErrorCode::ExpiredToken => 2004,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::DocumentNotFound => 4002,

            // External (8xxx)
            ErrorCode::ExtractionError => 8001,
            ErrorCode::UploadError => 8002,
            ErrorCode::RemoteQueryError => 8003,
            ErrorCode::ChatError => 8004,
            ErrorCode::UpstreamError => 8005,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    // Authentication errors
    #[error("Authentication required: {message}")]
    AuthRequired { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid or expired one-time code")]
    InvalidOtp,

    #[error("Token expired")]
    ExpiredToken,

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Bookmark not found: {id}")]
    DocumentNotFound { id: String },

    // External service errors
    #[error("Failed to extract content from {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("Permanent storage upload failed: {message}")]
    Upload { message: String },

    #[error("Permanent storage query failed: {message}")]
    RemoteQuery { message: String },

    #[error("Chat completion failed: {message}")]
    Chat { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidUrl { .. } => ErrorCode::InvalidUrl,
            AppError::AuthRequired { .. } => ErrorCode::AuthRequired,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidOtp => ErrorCode::InvalidOtp,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::Extraction { .. } => ErrorCode::ExtractionError,
            AppError::Upload { .. } => ErrorCode::UploadError,
            AppError::RemoteQuery { .. } => ErrorCode::RemoteQueryError,
            AppError::Chat { .. } => ErrorCode::ChatError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::AuthRequired { .. }
            | AppError::Unauthorized { .. }
            | AppError::InvalidOtp
            | AppError::ExpiredToken => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            AppError::NotFound { .. } | AppError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,

            // 502 Bad Gateway
            AppError::Extraction { .. }
            | AppError::Upload { .. }
            | AppError::Chat { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            AppError::RemoteQuery { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
                request_id: None, // Should be filled by middleware
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::DocumentNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Invalid url".into(),
            field: Some("url".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_auth_required_is_unauthorized() {
        let err = AppError::AuthRequired {
            message: "deletion requires an authenticated owner".into(),
        };
        assert_eq!(err.code(), ErrorCode::AuthRequired);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_upload_error_is_bad_gateway() {
        let err = AppError::Upload {
            message: "storage network unreachable".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_server_error());
    }
}
