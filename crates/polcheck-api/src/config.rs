//! # Service Configuration
//!
//! Read once at startup from environment variables. Model credentials are
//! not here; they live in [`polcheck_llm::LlmConfig`], which redacts them.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default cap on an upload request body: 32 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// How `/check_document` decides compliance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Literal, case-insensitive containment of each policy's full text.
    #[default]
    Substring,
    /// Delegate the judgement to the hosted model.
    Prompt,
}

impl EvaluationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Substring => "substring",
            Self::Prompt => "prompt",
        }
    }
}

impl std::fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(Self::Substring),
            "prompt" => Ok(Self::Prompt),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Evaluation strategy for `/check_document`.
    pub mode: EvaluationMode,
    /// Where raw uploaded PDFs are written and reloaded from at startup.
    pub upload_dir: Option<PathBuf>,
    /// Body limit for `/upload_policy`.
    pub max_upload_bytes: usize,
    /// Mount `/metrics` and the request metrics middleware.
    pub metrics_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            mode: EvaluationMode::default(),
            upload_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 5000)
    /// - `COMPLIANCE_MODE` (`substring` | `prompt`, default: `substring`)
    /// - `UPLOAD_DIR` (default: unset, uploads are not written to disk)
    /// - `MAX_UPLOAD_BYTES` (default: 33554432)
    /// - `POLCHECK_METRICS_ENABLED` (default: true; only `false` disables)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match std::env::var("PORT") {
            Ok(raw) => parse_number("PORT", &raw)?,
            Err(_) => defaults.port,
        };
        let mode = match std::env::var("COMPLIANCE_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.mode,
        };
        let max_upload_bytes = match std::env::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => parse_number("MAX_UPLOAD_BYTES", &raw)?,
            Err(_) => defaults.max_upload_bytes,
        };
        let upload_dir = std::env::var("UPLOAD_DIR")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from);
        let metrics_enabled = std::env::var("POLCHECK_METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Ok(Self {
            port,
            mode,
            upload_dir,
            max_upload_bytes,
            metrics_enabled,
        })
    }
}

fn parse_number<N: FromStr>(var: &'static str, raw: &str) -> Result<N, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("COMPLIANCE_MODE must be \"substring\" or \"prompt\", got {0:?}")]
    InvalidMode(String),
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}
