//! # Document Check
//!
//! `POST /check_document` evaluates a document against every stored policy
//! and answers with `{"compliance_report": {"is_compliant", "violations"}}`.
//!
//! Check order: the policy set is consulted before the body, so a service
//! with no policies answers `CONFIGURATION_ERROR` regardless of the request.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use polcheck_core::evaluator::require_document_text;
use polcheck_core::{EvaluationError, ReportEnvelope};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::compliance;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Request body for `/check_document`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckDocumentRequest {
    /// Full text of the document to check. Required and non-empty.
    #[serde(default)]
    pub document_text: Option<String>,
}

impl Validate for CheckDocumentRequest {
    fn validate(&self) -> Result<(), String> {
        require_document_text(self.document_text.as_deref())
            .map(|_| ())
            .map_err(|EvaluationError::InvalidInput(msg)| msg)
    }
}

/// OpenAPI shape of the check response.
#[derive(ToSchema)]
pub struct ComplianceResponseSchema {
    pub compliance_report: ComplianceReportSchema,
}

/// OpenAPI shape of a compliance report.
#[derive(ToSchema)]
pub struct ComplianceReportSchema {
    /// True exactly when `violations` is empty.
    pub is_compliant: bool,
    pub violations: Vec<ViolationSchema>,
}

/// OpenAPI shape of one violation.
#[derive(ToSchema)]
pub struct ViolationSchema {
    pub rule_violated: String,
    pub violating_text: String,
    pub suggestion: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/check_document", post(check_document))
}

/// POST /check_document: Check a document against the stored policies.
#[utoipa::path(
    post,
    path = "/check_document",
    request_body = CheckDocumentRequest,
    responses(
        (status = 200, description = "Compliance report", body = ComplianceResponseSchema),
        (status = 400, description = "No policies stored", body = crate::error::ErrorBody),
        (status = 422, description = "Missing or empty document_text", body = crate::error::ErrorBody),
        (status = 500, description = "Model completion did not match the report shape", body = crate::error::ErrorBody),
        (status = 502, description = "Model API error", body = crate::error::ErrorBody),
        (status = 503, description = "Prompt mode without model credentials", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub(crate) async fn check_document(
    State(state): State<AppState>,
    body: Result<Json<CheckDocumentRequest>, JsonRejection>,
) -> Result<Json<ReportEnvelope>, AppError> {
    let policies = compliance::load_policies(&state).await?;
    let req = extract_validated_json(body)?;
    let document_text = req.document_text.unwrap_or_default();

    let report = compliance::check_document(&state, &policies, &document_text).await?;
    Ok(Json(report.into_envelope()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_non_empty_text() {
        let missing = CheckDocumentRequest { document_text: None };
        assert_eq!(
            missing.validate().unwrap_err(),
            "No document_text found in request."
        );
        let empty = CheckDocumentRequest {
            document_text: Some(String::new()),
        };
        assert!(empty.validate().is_err());
        let ok = CheckDocumentRequest {
            document_text: Some("text".into()),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn missing_field_deserializes_as_none() {
        let req: CheckDocumentRequest = serde_json::from_str("{}").unwrap();
        assert!(req.document_text.is_none());
    }
}
