//! # Substring Evaluator
//!
//! Literal, case-insensitive containment check. A policy is satisfied when
//! its full text appears, case-folded, as a contiguous substring of the
//! case-folded document. Nothing else counts: a line-wrapped, re-punctuated
//! or paraphrased clause is reported as a violation. Callers that want
//! semantic judgement use the prompt path in [`crate::prompt`] instead.
//!
//! The evaluation is pure: no I/O, no allocation beyond the two case-folded
//! strings and the violations themselves.

use crate::error::EvaluationError;
use crate::policy::Policy;
use crate::report::{ComplianceReport, Violation};

/// `violating_text` of a substring violation. There is no excerpt to quote
/// because the problem is an absence.
pub const ABSENT_TEXT_SENTINEL: &str = "N/A (required policy text is absent)";

/// `suggestion` of a substring violation.
pub const INCLUDE_POLICY_SUGGESTION: &str = "Include the full text of the policy in the document.";

/// Resolve an optional request field to non-empty document text.
pub fn require_document_text(document_text: Option<&str>) -> Result<&str, EvaluationError> {
    match document_text {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(EvaluationError::missing_document_text()),
    }
}

/// Evaluate `document_text` against every policy, in order.
///
/// An empty `policies` slice yields a compliant report. An empty
/// `document_text` is rejected with [`EvaluationError::InvalidInput`].
pub fn evaluate(
    policies: &[Policy],
    document_text: &str,
) -> Result<ComplianceReport, EvaluationError> {
    let document = require_document_text(Some(document_text))?.to_lowercase();

    let violations: Vec<Violation> = policies
        .iter()
        .filter(|policy| !document.contains(&policy.text.to_lowercase()))
        .map(absent_policy_violation)
        .collect();

    tracing::debug!(
        policies = policies.len(),
        violations = violations.len(),
        "substring evaluation complete"
    );

    Ok(ComplianceReport::from_violations(violations))
}

fn absent_policy_violation(policy: &Policy) -> Violation {
    Violation {
        rule_violated: format!("Policy '{}' text not found in document", policy.filename),
        violating_text: ABSENT_TEXT_SENTINEL.to_string(),
        suggestion: INCLUDE_POLICY_SUGGESTION.to_string(),
    }
}
