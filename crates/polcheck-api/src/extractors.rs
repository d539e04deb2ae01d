//! # Request Extraction
//!
//! Handlers take `Result<Json<T>, JsonRejection>` or
//! `Result<Multipart, MultipartRejection>` so
//! that axum's rejections flow through [`AppError`] and keep the standard
//! error body instead of axum's plain-text defaults.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::Multipart;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;

use crate::error::AppError;

/// Request DTOs with rules beyond what serde checks.
pub trait Validate {
    /// Returns the client-facing message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body, mapping rejections to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Unwrap a JSON body and run its [`Validate`] rules.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Map a multipart stream failure to [`AppError::PayloadTooLarge`] when the
/// body limit tripped, [`AppError::BadRequest`] otherwise.
pub fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Unwrap a multipart extractor, mapping a missing or non-multipart
/// content type to [`AppError::BadRequest`].
pub fn extract_multipart(
    result: Result<Multipart, MultipartRejection>,
) -> Result<Multipart, AppError> {
    result.map_err(|err| AppError::BadRequest(err.body_text()))
}
