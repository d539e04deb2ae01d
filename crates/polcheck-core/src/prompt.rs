//! # Model Prompt Contract
//!
//! The prompt path delegates the compliance judgement to a hosted model.
//! What stays in this crate is the contract around that call:
//!
//! 1. the instruction template ([`PROMPT_TEMPLATE_VERSION`]), which asks for
//!    a single JSON object rooted at `compliance_report`;
//! 2. the strict parser for the completion ([`parse_completion`]), which
//!    turns every deviation from that shape into a [`ResponseFormatError`].
//!
//! Bumping the template wording means bumping the version constant.

use serde_json::Value;

use crate::error::{EvaluationError, ResponseFormatError};
use crate::evaluator::require_document_text;
use crate::policy::Policy;
use crate::report::{ComplianceReport, ReportWire};

/// Identifier of the template wording and the JSON shape it requests.
pub const PROMPT_TEMPLATE_VERSION: &str = "compliance-report/v1";

/// Separator between policy texts in the combined policy block.
pub const POLICY_SEPARATOR: &str = "\n\n";

/// Root key the model must return.
pub const REPORT_ROOT_KEY: &str = "compliance_report";

/// Join all policy texts into the block embedded in the prompt.
pub fn combine_policies(policies: &[Policy]) -> String {
    policies
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(POLICY_SEPARATOR)
}

/// Render the instruction prompt for `policies` and `document_text`.
///
/// Rejects an empty document with [`EvaluationError::InvalidInput`]. The
/// empty-policy case is the caller's short-circuit and is not checked here.
pub fn build_prompt(policies: &[Policy], document_text: &str) -> Result<String, EvaluationError> {
    let document_text = require_document_text(Some(document_text))?;
    let combined_policy = combine_policies(policies);

    Ok(format!(
        r#"
You are an expert compliance officer. Analyze the user document for any violations only against the provided policies.

Policies:
{combined_policy}

User Document:
{document_text}

Return your analysis as a single, valid JSON object. Do not include any text or formatting like "```json".
The JSON object must have a root key "{REPORT_ROOT_KEY}". The value should be an object with two keys:
- "is_compliant": a boolean value (true or false).
- "violations": an array of objects. Each object in the array should have:
  - "rule_violated": a string describing the rule that was violated.
  - "violating_text": a string containing the exact text from the document.
  - "suggestion": a string suggesting a fix.

If there are no violations, the "violations" array should be empty and "is_compliant" should be true.
"#
    ))
}

/// Parse a raw model completion into a [`ComplianceReport`].
///
/// Unknown extra keys are ignored; everything else about the shape is
/// checked, including that the verdict agrees with the violation list.
pub fn parse_completion(raw: &str) -> Result<ComplianceReport, ResponseFormatError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ResponseFormatError::Empty);
    }

    let value: Value = serde_json::from_str(raw).map_err(ResponseFormatError::NotJson)?;

    let root = value.as_object().ok_or_else(|| {
        ResponseFormatError::Shape(format!("expected a JSON object, got {}", type_name(&value)))
    })?;

    let inner = root.get(REPORT_ROOT_KEY).ok_or_else(|| {
        ResponseFormatError::Shape(format!("missing root key \"{REPORT_ROOT_KEY}\""))
    })?;

    let wire: ReportWire = serde_json::from_value(inner.clone())
        .map_err(|e| ResponseFormatError::Shape(format!("{REPORT_ROOT_KEY}: {e}")))?;

    ComplianceReport::try_from(wire)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
