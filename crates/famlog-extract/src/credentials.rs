//! Credential providers.

use std::collections::HashMap;

use famlog_core::{defaults, CredentialProvider};

/// Reads backend credentials from environment variables.
///
/// | Credential | Variable |
/// |------------|----------|
/// | `gemini` | `GOOGLE_GEMINI_API_KEY` |
/// | `anthropic` | `ANTHROPIC_API_KEY` |
///
/// Empty values are treated as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    fn env_var_for(backend: &str) -> Option<&'static str> {
        match backend {
            defaults::GEMINI_CREDENTIAL => Some(defaults::ENV_GEMINI_API_KEY),
            defaults::ANTHROPIC_CREDENTIAL => Some(defaults::ENV_ANTHROPIC_API_KEY),
            _ => None,
        }
    }
}

impl CredentialProvider for EnvCredentials {
    fn get_credential(&self, backend: &str) -> Option<String> {
        let var = Self::env_var_for(backend)?;
        std::env::var(var).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Fixed in-memory credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    keys: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, backend: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(backend.into(), key.into());
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn get_credential(&self, backend: &str) -> Option<String> {
        self.keys
            .get(backend)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}
