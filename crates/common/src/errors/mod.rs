//! Error types for Grafka services
//!
//! Provides a single error enum shared by every component with:
//! - Distinct variants for each failure mode of the pipeline
//! - Machine-readable error codes
//! - HTTP status code mapping for the gateway
//! - A classification of which errors are absorbed as degraded evidence

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
    // Input errors (1xxx)
    InvalidInput,
    ValidationError,
    DimensionMismatch,

    // Evidence source errors (8xxx)
    SourceUnavailable,
    SourceTimeout,
    EmbeddingError,
    UpstreamError,

    // Request lifecycle (6xxx)
    RateLimited,
    Cancelled,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 1001,
            ErrorCode::ValidationError => 1002,
            ErrorCode::DimensionMismatch => 1003,

            ErrorCode::RateLimited => 6001,
            ErrorCode::Cancelled => 6002,

            ErrorCode::SourceUnavailable => 8001,
            ErrorCode::SourceTimeout => 8002,
            ErrorCode::EmbeddingError => 8003,
            ErrorCode::UpstreamError => 8004,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing input
    #[error("Invalid input: {message}")]
    Input { message: String },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Vector dimension mismatch: {actual} != {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An evidence source (graph engine, schema, generator, vector service) is not reachable
    #[error("{source_name} unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    #[error("{source_name} timed out after {timeout_ms}ms")]
    Timeout {
        source_name: String,
        timeout_ms: u64,
    },

    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Query cancelled")]
    Cancelled,

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal error: {message}")]
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
    pub fn input(message: impl Into<String>) -> Self {
        AppError::Input {
            message: message.into(),
        }
    }

    pub fn unavailable(source_name: impl Into<String>, message: impl ToString) -> Self {
        AppError::SourceUnavailable {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Input { .. } => ErrorCode::InvalidInput,
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            AppError::SourceUnavailable { .. } => ErrorCode::SourceUnavailable,
            AppError::Timeout { .. } => ErrorCode::SourceTimeout,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::Cancelled => ErrorCode::Cancelled,
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
            AppError::Input { .. }
            | AppError::Validation { .. }
            | AppError::DimensionMismatch { .. } => StatusCode::BAD_REQUEST,

            // 429 Too Many Requests
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 499 is not in the registry, the closest standard code is 408
            AppError::Cancelled => StatusCode::REQUEST_TIMEOUT,

            // 500 Internal Server Error
            AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::EmbeddingError { .. } | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 / 504
            AppError::SourceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Errors that degrade a single evidence source instead of failing the query
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            AppError::SourceUnavailable { .. }
                | AppError::Timeout { .. }
                | AppError::EmbeddingError { .. }
                | AppError::HttpClient(_)
        )
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
    pub numeric_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
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

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                numeric_code: code.as_code(),
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Input {
            message: err.to_string(),
        }
    }
}

impl From<tonic::Status> for AppError {
    fn from(status: tonic::Status) -> Self {
        AppError::SourceUnavailable {
            source_name: "graph engine".to_string(),
            message: status.message().to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::DimensionMismatch {
            expected: 384,
            actual: 3,
        };
        assert_eq!(err.code(), ErrorCode::DimensionMismatch);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Vector dimension mismatch: 3 != 384");
    }

    #[test]
    fn test_degradable_classification() {
        assert!(AppError::unavailable("graph engine", "connection refused").is_degradable());
        assert!(AppError::Timeout {
            source_name: "vector".into(),
            timeout_ms: 10
        }
        .is_degradable());
        assert!(!AppError::Configuration {
            message: "no sources".into()
        }
        .is_degradable());
        assert!(!AppError::input("empty").is_degradable());
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Configuration {
            message: "no evidence sources configured".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_tonic_status_becomes_unavailable() {
        let err: AppError = tonic::Status::unavailable("engine down").into();
        assert_eq!(err.code(), ErrorCode::SourceUnavailable);
        assert!(err.to_string().contains("engine down"));
    }
}
