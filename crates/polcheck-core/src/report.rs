//! # Compliance Reports
//!
//! A [`ComplianceReport`] is the verdict of one evaluation: whether the
//! candidate document satisfies every stored policy, plus the itemized
//! [`Violation`]s. The verdict is derived from the violations, never stored
//! independently of them.

use serde::{Deserialize, Serialize};

use crate::error::ResponseFormatError;

/// A single detected failure to satisfy one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Human-readable description of the rule that was violated.
    pub rule_violated: String,
    /// The offending text, or a sentinel when the problem is an absence.
    pub violating_text: String,
    /// Suggested remedy.
    pub suggestion: String,
}

/// Structured compliance verdict.
///
/// Construct with [`ComplianceReport::compliant`] or
/// [`ComplianceReport::from_violations`]. Deserialization goes through the
/// same consistency check, so a report claiming `is_compliant: true` while
/// listing violations cannot be materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReportWire")]
pub struct ComplianceReport {
    is_compliant: bool,
    violations: Vec<Violation>,
}

impl ComplianceReport {
    /// A report with no violations.
    pub fn compliant() -> Self {
        Self {
            is_compliant: true,
            violations: Vec::new(),
        }
    }

    /// Build a report whose verdict follows from `violations`.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            is_compliant: violations.is_empty(),
            violations,
        }
    }

    /// `true` exactly when there are no violations.
    pub fn is_compliant(&self) -> bool {
        self.is_compliant
    }

    /// Violations in the order they were detected.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Wrap in the `{"compliance_report": ...}` envelope.
    pub fn into_envelope(self) -> ReportEnvelope {
        ReportEnvelope {
            compliance_report: self,
        }
    }
}

/// Unchecked wire form, validated on the way into [`ComplianceReport`].
#[derive(Deserialize)]
pub(crate) struct ReportWire {
    pub(crate) is_compliant: bool,
    pub(crate) violations: Vec<Violation>,
}

impl TryFrom<ReportWire> for ComplianceReport {
    type Error = ResponseFormatError;

    fn try_from(wire: ReportWire) -> Result<Self, Self::Error> {
        if wire.is_compliant != wire.violations.is_empty() {
            return Err(ResponseFormatError::InconsistentVerdict {
                is_compliant: wire.is_compliant,
                violations: wire.violations.len(),
            });
        }
        Ok(Self::from_violations(wire.violations))
    }
}

/// Root object of every compliance response: `{"compliance_report": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEnvelope {
    /// The wrapped report.
    pub compliance_report: ComplianceReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(rule: &str) -> Violation {
        Violation {
            rule_violated: rule.to_string(),
            violating_text: "text".to_string(),
            suggestion: "fix".to_string(),
        }
    }

    #[test]
    fn compliant_report_has_no_violations() {
        let report = ComplianceReport::compliant();
        assert!(report.is_compliant());
        assert!(report.violations().is_empty());
    }

    #[test]
    fn verdict_follows_violations() {
        assert!(ComplianceReport::from_violations(vec![]).is_compliant());
        let report = ComplianceReport::from_violations(vec![violation("a"), violation("b")]);
        assert!(!report.is_compliant());
        assert_eq!(report.violations().len(), 2);
        assert_eq!(report.violations()[0].rule_violated, "a");
    }

    #[test]
    fn envelope_serializes_with_root_key() {
        let json = serde_json::to_value(ComplianceReport::compliant().into_envelope()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "compliance_report": { "is_compliant": true, "violations": [] }
            })
        );
    }

    #[test]
    fn violation_serializes_field_names() {
        let json = serde_json::to_value(violation("rule")).unwrap();
        assert_eq!(json["rule_violated"], "rule");
        assert_eq!(json["violating_text"], "text");
        assert_eq!(json["suggestion"], "fix");
    }

    #[test]
    fn deserialize_rejects_compliant_with_violations() {
        let raw = r#"{"is_compliant": true, "violations": [
            {"rule_violated": "r", "violating_text": "t", "suggestion": "s"}
        ]}"#;
        let err = serde_json::from_str::<ComplianceReport>(raw).unwrap_err();
        assert!(err.to_string().contains("inconsistent"), "got: {err}");
    }

    #[test]
    fn deserialize_rejects_non_compliant_without_violations() {
        let raw = r#"{"is_compliant": false, "violations": []}"#;
        assert!(serde_json::from_str::<ComplianceReport>(raw).is_err());
    }

    #[test]
    fn deserialize_accepts_consistent_report() {
        let raw = r#"{"is_compliant": false, "violations": [
            {"rule_violated": "r", "violating_text": "t", "suggestion": "s"}
        ]}"#;
        let report: ComplianceReport = serde_json::from_str(raw).unwrap();
        assert!(!report.is_compliant());
        assert_eq!(report.violations()[0].suggestion, "s");
    }
}
