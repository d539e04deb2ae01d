//! # polcheck-llm: Hosted Model Client
//!
//! Typed client for the Generative Language `generateContent` endpoint.
//! It does one thing: send a prompt, ask for a JSON-typed completion, and
//! return the completion text untouched. Interpreting that text is the job
//! of `polcheck_core::prompt::parse_completion`.
//!
//! ## Request shape
//!
//! ```text
//! POST {base_url}/v1beta/models/{model}:generateContent
//! x-goog-api-key: <key>
//!
//! {"contents":[{"role":"user","parts":[{"text":"..."}]}],
//!  "generationConfig":{"responseMimeType":"application/json"}}
//! ```
//!
//! ## Timeout & Retry
//!
//! No timeout unless [`LlmConfig::timeout_secs`] is set. No retries: a
//! failed call is reported to the caller as-is.

pub mod config;
pub mod error;

pub use config::LlmConfig;
pub use error::LlmError;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// MIME type requested for completions.
pub const JSON_MIME_TYPE: &str = "application/json";

// -- Wire types ---------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
}

/// `generateContent` response, reduced to the fields we read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn into_completion_text(self) -> Result<String, LlmError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(LlmError::EmptyCompletion {
                reason: match block_reason {
                    Some(reason) => format!("prompt blocked: {reason}"),
                    None => "no candidates".to_string(),
                },
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::EmptyCompletion {
                reason: format!(
                    "candidate has no text (finish_reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            });
        }

        Ok(text)
    }
}

// -- Client -------------------------------------------------------------------

/// Client for the hosted model API.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl LlmClient {
    /// Create a new client from configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder().default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                "x-goog-api-key",
                reqwest::header::HeaderValue::from_str(&config.api_key)
                    .map_err(|_| LlmError::Config(config::ConfigError::InvalidApiKey))?,
            );
            headers.insert(
                reqwest::header::CONTENT_TYPE,
                reqwest::header::HeaderValue::from_static("application/json"),
            );
            headers
        });
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| LlmError::Http {
            endpoint: "client_init".into(),
            source: e,
        })?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.as_str().trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            http,
            endpoint,
            model: config.model,
        })
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Submit `prompt` and return the raw completion text.
    ///
    /// The completion is requested as `application/json` but is not parsed
    /// here; it may still be malformed.
    pub async fn generate_json(&self, prompt: &str) -> Result<String, LlmError> {
        let endpoint = "POST :generateContent";
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME_TYPE,
            },
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending generateContent request");

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let parsed: GenerateContentResponse =
            resp.json().await.map_err(|e| LlmError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let text = parsed.into_completion_text()?;
        tracing::debug!(model = %self.model, completion = %text, "raw model completion");
        Ok(text)
    }
}
