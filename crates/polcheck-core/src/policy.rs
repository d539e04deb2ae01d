//! Stored policy record.

use serde::{Deserialize, Serialize};

/// A compliance policy: the plain text extracted from an uploaded document,
/// keyed by its (sanitized) filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique key. Re-uploading the same filename replaces the text.
    pub filename: String,
    /// Extracted plain text.
    pub text: String,
}

impl Policy {
    /// Create a policy record.
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
        }
    }
}
