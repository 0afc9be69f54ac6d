//! Classifier configuration types.

use serde::{Deserialize, Serialize};

/// LLM provider backing the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Anthropic Claude API.
    Anthropic,
    /// Google Gemini API.
    Gemini,
}

/// Classifier configuration.
///
/// The whole section is optional in the service config; when absent, or
/// when `api_key` is absent, classification is disabled and every call
/// reports unavailable without any network I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// LLM provider.
    pub provider: LlmProvider,
    /// Model name/identifier.
    pub model: String,
    /// API key. Absence disables the classifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (proxies, test servers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Hard deadline for a single classification call, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Maximum tokens for the completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout() -> u32 {
    10
}

fn default_max_tokens() -> u32 {
    200
}

impl ClassifierConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.is_empty() {
            return Err("classifier model name cannot be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("classifier timeout_secs must be greater than zero".to_string());
        }
        if self.max_tokens == 0 {
            return Err("classifier max_tokens must be greater than zero".to_string());
        }
        Ok(())
    }
}
