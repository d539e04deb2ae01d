//! Model client configuration.
//!
//! Defaults point at the public Generative Language endpoint. Override via
//! environment variables or explicit construction for staging and tests.

use url::Url;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Configuration for the hosted model client.
///
/// Custom `Debug` implementation redacts the `api_key` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct LlmConfig {
    /// API base URL, without the `/v1beta/...` suffix.
    pub base_url: Url,
    /// Model name, e.g. `gemini-1.5-flash-latest`.
    pub model: String,
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Request timeout in seconds. `None` means no timeout.
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    /// Configuration for `base_url` with the default model and no timeout.
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            timeout_secs: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GOOGLE_API_KEY` (required)
    /// - `LLM_BASE_URL` (default: `https://generativelanguage.googleapis.com`)
    /// - `LLM_MODEL` (default: `gemini-1.5-flash-latest`)
    /// - `LLM_TIMEOUT_SECS` (default: unset, no timeout)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let timeout_secs = match std::env::var("LLM_TIMEOUT_SECS") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            base_url: env_url("LLM_BASE_URL", DEFAULT_BASE_URL)?,
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            api_key,
            timeout_secs,
        })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GOOGLE_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("GOOGLE_API_KEY contains characters that are not valid in an HTTP header")]
    InvalidApiKey,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("LLM_TIMEOUT_SECS must be a whole number of seconds, got {0:?}")]
    InvalidTimeout(String),
}
