//! Model client error types.

/// Errors from model API calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The model API returned a non-2xx status.
    #[error("model API {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The response envelope could not be deserialized.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The response carried no completion text (blocked prompt, no candidates).
    #[error("model returned no completion text: {reason}")]
    EmptyCompletion { reason: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}
