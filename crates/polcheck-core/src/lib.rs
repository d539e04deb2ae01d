//! # polcheck-core: Policy Compliance Foundations
//!
//! Pure, I/O-free building blocks shared by the HTTP service and the CLI:
//!
//! - [`policy`]: the stored [`Policy`] record (filename → extracted text).
//! - [`report`]: [`ComplianceReport`] and [`Violation`], plus the
//!   `{"compliance_report": ...}` wire envelope.
//! - [`evaluator`]: the literal, case-insensitive substring evaluator.
//! - [`prompt`]: the versioned instruction template sent to a hosted model
//!   and the strict parser for its completion.
//! - [`error`]: the error taxonomy for evaluation and model output.
//!
//! ## Invariant
//!
//! `ComplianceReport::is_compliant() == violations().is_empty()` holds for
//! every report, however it was obtained. Reports are only built from their
//! violations, and deserialization rejects documents that disagree.

#![deny(missing_docs)]

pub mod error;
pub mod evaluator;
pub mod policy;
pub mod prompt;
pub mod report;

pub use error::{EvaluationError, ResponseFormatError};
pub use evaluator::evaluate;
pub use policy::Policy;
pub use report::{ComplianceReport, ReportEnvelope, Violation};
