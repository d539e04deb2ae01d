//! # Error Types
//!
//! Evaluation errors are client-facing (the caller sent something unusable).
//! Response format errors are server-facing: the hosted model returned a
//! completion that does not match the requested report shape.

use thiserror::Error;

/// Failure to run an evaluation over the supplied inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// A required input was missing or empty.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EvaluationError {
    /// The canonical error for an absent or empty `document_text`.
    pub fn missing_document_text() -> Self {
        Self::InvalidInput("No document_text found in request.".to_string())
    }
}

/// The model completion could not be turned into a compliance report.
///
/// Every variant is terminal: there is no retry and no partial result.
#[derive(Error, Debug)]
pub enum ResponseFormatError {
    /// The completion was empty or whitespace.
    #[error("model returned an empty completion")]
    Empty,

    /// The completion was not a JSON document.
    #[error("model completion is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    /// The completion was JSON but not a `{"compliance_report": ...}` object.
    #[error("model completion does not match the report shape: {0}")]
    Shape(String),

    /// `is_compliant` disagrees with the emptiness of `violations`.
    #[error("model verdict is inconsistent: is_compliant={is_compliant} with {violations} violation(s)")]
    InconsistentVerdict {
        /// The verdict the model claimed.
        is_compliant: bool,
        /// Number of violations the model listed.
        violations: usize,
    },
}
