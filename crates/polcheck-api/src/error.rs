//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps errors from polcheck-core, polcheck-extract, polcheck-llm and the
//! store to HTTP status codes with a JSON body carrying an error code,
//! message, and optional details. Internal and upstream details are logged,
//! never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use polcheck_core::{EvaluationError, ResponseFormatError};
use polcheck_extract::ExtractionError;
use polcheck_llm::LlmError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::StoreError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "CONFIGURATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    ///
    /// Shares 422 with `Validation`: only malformed HTTP framing is a 400,
    /// and axum rejects that before a handler runs.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Upload body exceeded the configured limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// The service cannot evaluate in its current configuration, e.g. no
    /// policies are stored yet (400).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An uploaded document could not be converted to text (500).
    #[error("extraction error: {filename}: {reason}")]
    Extraction { filename: String, reason: String },

    /// The model completion did not match the report contract (500).
    #[error("AI response format error: {0}")]
    AiResponseFormat(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// The model API returned an error or is unreachable (502).
    #[error("upstream model API error: {0}")]
    UpstreamError(String),

    /// Service dependency not configured (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Configuration(_) => (StatusCode::BAD_REQUEST, "CONFIGURATION_ERROR"),
            Self::Extraction { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "EXTRACTION_ERROR"),
            Self::AiResponseFormat(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AI_RESPONSE_FORMAT_ERROR")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::UpstreamError(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }

    /// Construct a service unavailable error (503).
    pub fn service_unavailable(msg: &str) -> Self {
        Self::ServiceUnavailable(msg.to_string())
    }

    /// Construct a not-found error (404).
    pub fn not_found(msg: String) -> Self {
        Self::NotFound(msg)
    }

    /// Construct an extraction error for one uploaded file.
    pub fn extraction(filename: &str, err: &ExtractionError) -> Self {
        Self::Extraction {
            filename: filename.to_string(),
            reason: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal/upstream error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::UpstreamError(_) => "An upstream service error occurred".to_string(),
            Self::AiResponseFormat(_) => "Failed to decode JSON from AI response.".to_string(),
            Self::Extraction { filename, .. } => {
                format!("Failed to extract text from '{filename}'.")
            }
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::UpstreamError(_) => tracing::error!(error = %self, "upstream API error"),
            Self::AiResponseFormat(_) => tracing::error!(error = %self, "unusable model completion"),
            Self::Extraction { .. } => tracing::error!(error = %self, "text extraction failed"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EvaluationError> for AppError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::InvalidInput(msg) => Self::Validation(msg),
        }
    }
}

impl From<ResponseFormatError> for AppError {
    fn from(err: ResponseFormatError) -> Self {
        Self::AiResponseFormat(err.to_string())
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::EmptyCompletion { .. } => Self::AiResponseFormat(err.to_string()),
            LlmError::Config(_) => Self::Internal(err.to_string()),
            LlmError::Http { .. } | LlmError::ApiError { .. } | LlmError::Deserialization { .. } => {
                Self::UpstreamError(err.to_string())
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}
