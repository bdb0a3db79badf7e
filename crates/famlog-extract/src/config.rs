//! Extraction configuration.
//!
//! Built once at process start (usually from environment variables) and
//! injected into the adapters. Nothing inside the pipeline reads the
//! environment after construction.
//!
//! # Example
//!
//! ```rust,no_run
//! use famlog_extract::config::ExtractionConfig;
//!
//! let config = ExtractionConfig::from_env();
//! config.validate().expect("invalid extraction config");
//! ```

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use famlog_core::{defaults, Error, Result};

/// Gemini speech backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for the Generative Language API.
    pub base_url: String,
    /// Model used for transcription.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::GEMINI_URL.to_string(),
            model: defaults::GEMINI_MODEL.to_string(),
            timeout_secs: defaults::GEMINI_TIMEOUT_SECS,
        }
    }
}

/// Claude vision backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaudeConfig {
    /// Base URL for the Anthropic API.
    pub base_url: String,
    /// Model used for receipt extraction.
    pub model: String,
    /// Value of the `anthropic-version` header.
    pub api_version: String,
    /// Maximum tokens in the reply.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::ANTHROPIC_URL.to_string(),
            model: defaults::ANTHROPIC_MODEL.to_string(),
            api_version: defaults::ANTHROPIC_VERSION.to_string(),
            max_tokens: defaults::ANTHROPIC_MAX_TOKENS,
            timeout_secs: defaults::ANTHROPIC_TIMEOUT_SECS,
        }
    }
}

/// Local Tesseract OCR configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TesseractConfig {
    /// Binary name or path.
    pub binary: String,
    /// Language packs passed with `-l`.
    pub languages: String,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: defaults::TESSERACT_BIN.to_string(),
            languages: defaults::TESSERACT_LANG.to_string(),
        }
    }
}

/// Top-level extraction configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub gemini: GeminiConfig,
    pub claude: ClaudeConfig,
    pub tesseract: TesseractConfig,
    /// Upper bound for one chain attempt, in seconds.
    pub attempt_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            claude: ClaudeConfig::default(),
            tesseract: TesseractConfig::default(),
            attempt_timeout_secs: defaults::ATTEMPT_TIMEOUT_SECS,
        }
    }
}

impl ExtractionConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Credentials are not part of this struct; see
    /// [`crate::credentials::EnvCredentials`].
    pub fn from_env() -> Self {
        let base = Self::default();
        let config = Self {
            gemini: GeminiConfig {
                base_url: env_or(defaults::ENV_GEMINI_BASE_URL, base.gemini.base_url),
                model: env_or(defaults::ENV_GEMINI_MODEL, base.gemini.model),
                timeout_secs: env_parse(defaults::ENV_GEMINI_TIMEOUT, base.gemini.timeout_secs),
            },
            claude: ClaudeConfig {
                base_url: env_or(defaults::ENV_ANTHROPIC_BASE_URL, base.claude.base_url),
                model: env_or(defaults::ENV_ANTHROPIC_MODEL, base.claude.model),
                api_version: env_or(defaults::ENV_ANTHROPIC_VERSION, base.claude.api_version),
                max_tokens: env_parse(defaults::ENV_ANTHROPIC_MAX_TOKENS, base.claude.max_tokens),
                timeout_secs: env_parse(defaults::ENV_ANTHROPIC_TIMEOUT, base.claude.timeout_secs),
            },
            tesseract: TesseractConfig {
                binary: env_or(defaults::ENV_TESSERACT_BIN, base.tesseract.binary),
                languages: env_or(defaults::ENV_TESSERACT_LANG, base.tesseract.languages),
            },
            attempt_timeout_secs: env_parse(defaults::ENV_ATTEMPT_TIMEOUT, base.attempt_timeout_secs),
        };
        debug!(?config, "Loaded extraction config from environment");
        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_base_url("Gemini", &self.gemini.base_url)?;
        validate_base_url("Anthropic", &self.claude.base_url)?;

        if self.gemini.model.is_empty() {
            return Err(Error::Config("Gemini model cannot be empty".to_string()));
        }
        if self.claude.model.is_empty() {
            return Err(Error::Config("Anthropic model cannot be empty".to_string()));
        }
        if self.claude.max_tokens == 0 {
            return Err(Error::Config(
                "Anthropic max_tokens must be greater than zero".to_string(),
            ));
        }
        if self.gemini.timeout_secs == 0
            || self.claude.timeout_secs == 0
            || self.attempt_timeout_secs == 0
        {
            return Err(Error::Config(
                "Timeouts must be greater than zero".to_string(),
            ));
        }
        if self.tesseract.binary.is_empty() {
            return Err(Error::Config("Tesseract binary cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

fn validate_base_url(name: &str, url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(Error::Config(format!("{} base_url cannot be empty", name)));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(Error::Config(format!(
            "{} base_url must start with http:// or https://, got: {}",
            name, url
        )));
    }
    Ok(())
}

fn env_or(var: &str, default: String) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

fn env_parse<T: FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
