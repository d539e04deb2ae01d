//! # API Route Modules
//!
//! - `index`: the static upload/check page at `/`.
//! - `policies`: policy upload (multipart PDF → extracted text), listing,
//!   and deletion.
//! - `check`: `/check_document`, returning a `{compliance_report}` envelope.

pub mod check;
pub mod index;
pub mod policies;
