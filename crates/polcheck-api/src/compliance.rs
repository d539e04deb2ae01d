//! # Compliance Check Orchestration
//!
//! Glue between the HTTP handler and the evaluators: take a policy snapshot,
//! dispatch on [`EvaluationMode`], and record the outcome.
//!
//! ```text
//! substring:  snapshot → evaluate()
//! prompt:     snapshot → build_prompt() → LlmClient::generate_json() → parse_completion()
//! ```
//!
//! Neither path retries, and no failure is turned into a compliant verdict.

use std::time::Instant;

use polcheck_core::prompt::{build_prompt, parse_completion};
use polcheck_core::{evaluate, ComplianceReport, Policy};

use crate::config::EvaluationMode;
use crate::error::AppError;
use crate::middleware::metrics::EvaluationOutcome;
use crate::state::AppState;

/// Client-facing message when a check is attempted with nothing to check against.
pub const NO_POLICIES_MESSAGE: &str =
    "No compliance policies uploaded. Please upload policies first.";

/// Snapshot the stored policies, refusing an empty set.
pub async fn load_policies(state: &AppState) -> Result<Vec<Policy>, AppError> {
    let policies = state.policies.snapshot().await?;
    if policies.is_empty() {
        return Err(AppError::Configuration(NO_POLICIES_MESSAGE.to_string()));
    }
    Ok(policies)
}

/// Evaluate `document_text` against `policies` in the configured mode.
pub async fn check_document(
    state: &AppState,
    policies: &[Policy],
    document_text: &str,
) -> Result<ComplianceReport, AppError> {
    let mode = state.config.mode;
    let start = Instant::now();

    let result = match mode {
        EvaluationMode::Substring => evaluate(policies, document_text).map_err(AppError::from),
        EvaluationMode::Prompt => check_with_model(state, policies, document_text).await,
    };

    let outcome = match &result {
        Ok(report) if report.is_compliant() => EvaluationOutcome::Compliant,
        Ok(_) => EvaluationOutcome::NonCompliant,
        Err(_) => EvaluationOutcome::Error,
    };
    state
        .metrics
        .record_evaluation(mode.as_str(), outcome, start.elapsed().as_secs_f64());

    match &result {
        Ok(report) => tracing::info!(
            %mode,
            policies = policies.len(),
            is_compliant = report.is_compliant(),
            violations = report.violations().len(),
            "compliance check complete"
        ),
        Err(e) => tracing::warn!(%mode, error = %e, "compliance check failed"),
    }

    result
}

async fn check_with_model(
    state: &AppState,
    policies: &[Policy],
    document_text: &str,
) -> Result<ComplianceReport, AppError> {
    // Cheap input checks happen before deciding whether the model is reachable.
    let prompt = build_prompt(policies, document_text)?;

    let client = state.llm_client.as_ref().ok_or_else(|| {
        AppError::service_unavailable("prompt mode requires GOOGLE_API_KEY to be configured")
    })?;

    let completion = client.generate_json(&prompt).await?;
    Ok(parse_completion(&completion)?)
}
