//! Advisory ticket classification.
//!
//! One bounded call to the configured LLM per request, no retries, no
//! caching. Every failure mode collapses into "no suggestion": the
//! caller treats the advisory as absent and carries on, so a degraded
//! provider can never break the ticket write path.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::CLASSIFICATIONS_TOTAL;
use crate::ticket::{Category, Priority};

use super::config::{ClassifierConfig, LlmProvider};
use super::llm::{AnthropicClient, CompletionRequest, GeminiClient, LlmClient, LlmError};

/// A suggested (category, priority) pair for a ticket description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: Category,
    pub priority: Priority,
}

/// Why a classification call produced no suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Degraded {
    Disabled,
    EmptyInput,
    Timeout,
    Transport,
    Api,
    Malformed,
    OutOfEnum,
}

impl Degraded {
    fn as_label(self) -> &'static str {
        match self {
            Degraded::Disabled => "disabled",
            Degraded::EmptyInput => "empty",
            Degraded::Timeout => "timeout",
            Degraded::Transport => "transport",
            Degraded::Api => "api",
            Degraded::Malformed => "malformed",
            Degraded::OutOfEnum => "out_of_enum",
        }
    }
}

/// Shape the provider is instructed to return.
#[derive(Debug, Deserialize)]
struct RawSuggestion {
    category: String,
    priority: String,
}

/// Classifies ticket descriptions through an injected [`LlmClient`].
pub struct ClassificationService {
    client: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
    max_tokens: u32,
}

impl ClassificationService {
    /// A service with no provider: every call reports unavailable.
    pub fn disabled() -> Self {
        Self {
            client: None,
            timeout: Duration::from_secs(10),
            max_tokens: 200,
        }
    }

    /// A service backed by an explicit client (tests inject mocks here).
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration, max_tokens: u32) -> Self {
        Self {
            client: Some(client),
            timeout,
            max_tokens,
        }
    }

    /// Build from configuration. A missing section or missing API key is
    /// a first-class disabled state, not an error.
    pub fn from_config(config: Option<&ClassifierConfig>) -> Self {
        let Some(config) = config else {
            info!("no classifier configured, classification disabled");
            return Self::disabled();
        };

        let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!(
                provider = ?config.provider,
                "classifier API key not set, classification disabled"
            );
            return Self::disabled();
        };

        let client: Arc<dyn LlmClient> = match config.provider {
            LlmProvider::Anthropic => {
                let mut client = AnthropicClient::new(api_key, &config.model);
                if let Some(base) = &config.api_base {
                    client = client.with_api_base(base);
                }
                Arc::new(client)
            }
            LlmProvider::Gemini => {
                let mut client = GeminiClient::new(api_key, &config.model);
                if let Some(base) = &config.api_base {
                    client = client.with_api_base(base);
                }
                Arc::new(client)
            }
        };

        info!(
            provider = client.provider(),
            model = client.model(),
            timeout_secs = config.timeout_secs,
            "classification service initialized"
        );

        Self::new(
            client,
            Duration::from_secs(u64::from(config.timeout_secs)),
            config.max_tokens,
        )
    }

    /// True when a provider is configured.
    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Suggest a (category, priority) pair for a description.
    ///
    /// `None` means unavailable for any reason: disabled service, empty
    /// input, timeout, transport failure, malformed payload, or a value
    /// outside the enumerations. The cause is logged and counted but
    /// never surfaced as an error.
    pub async fn classify(&self, description: &str) -> Option<Suggestion> {
        match self.try_classify(description).await {
            Ok(suggestion) => {
                CLASSIFICATIONS_TOTAL.with_label_values(&["ok"]).inc();
                info!(
                    category = %suggestion.category,
                    priority = %suggestion.priority,
                    "classification succeeded"
                );
                Some(suggestion)
            }
            Err(reason) => {
                CLASSIFICATIONS_TOTAL
                    .with_label_values(&[reason.as_label()])
                    .inc();
                None
            }
        }
    }

    async fn try_classify(&self, description: &str) -> Result<Suggestion, Degraded> {
        let Some(client) = &self.client else {
            debug!("classification requested but service is disabled");
            return Err(Degraded::Disabled);
        };

        let description = description.trim();
        if description.is_empty() {
            debug!("empty description, skipping provider call");
            return Err(Degraded::EmptyInput);
        }

        let request =
            CompletionRequest::new(build_prompt(description)).with_max_tokens(self.max_tokens);

        let response = match tokio::time::timeout(self.timeout, client.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(LlmError::Http(e))) => {
                warn!(provider = client.provider(), error = %e, "classification transport failure");
                return Err(Degraded::Transport);
            }
            Ok(Err(LlmError::Api { status, message })) => {
                warn!(
                    provider = client.provider(),
                    status, %message,
                    "classification provider returned an error"
                );
                return Err(Degraded::Api);
            }
            Ok(Err(LlmError::Json(e))) => {
                warn!(provider = client.provider(), error = %e, "classification response not decodable");
                return Err(Degraded::Malformed);
            }
            Err(_elapsed) => {
                // timeout() dropped the in-flight future, cancelling the call
                warn!(
                    provider = client.provider(),
                    timeout = ?self.timeout,
                    "classification timed out"
                );
                return Err(Degraded::Timeout);
            }
        };

        parse_suggestion(&response.text).map_err(|reason| {
            warn!(
                provider = client.provider(),
                response = %response.text,
                cause = reason.as_label(),
                "classification response rejected"
            );
            reason
        })
    }
}

/// Prompt embedding both enumerations and demanding a bare JSON object.
fn build_prompt(description: &str) -> String {
    format!(
        r#"You are a support ticket classification assistant. Analyze the ticket description and suggest:
1. A category (one of: billing, technical, account, general)
2. A priority level (one of: low, medium, high, critical)

Category definitions:
- billing: Payment issues, invoices, refunds, pricing questions
- technical: Software bugs, errors, performance issues, integration problems
- account: Login issues, password resets, account settings, permissions
- general: Questions, feedback, feature requests, other inquiries

Priority definitions:
- low: Minor issues, questions, non-urgent requests
- medium: Standard issues affecting a single user, workarounds available
- high: Significant issues affecting multiple users or business operations
- critical: System down, data loss, security issues, blocking all users

You must respond with ONLY a valid JSON object in this exact format:
{{
  "category": "one of: billing, technical, account, general",
  "priority": "one of: low, medium, high, critical"
}}

Do not include any explanation, markdown formatting, or additional text.

Ticket description:
{description}"#
    )
}

/// Parse the raw provider text into a validated [`Suggestion`].
///
/// Tolerates incidental wrappers (markdown fences, prose) by taking the
/// first `{{..}}` span, then validates both values against the enums.
fn parse_suggestion(text: &str) -> Result<Suggestion, Degraded> {
    let json_str = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(Degraded::Malformed),
    };

    let raw: RawSuggestion =
        serde_json::from_str(json_str).map_err(|_| Degraded::Malformed)?;

    let category: Category = raw.category.parse().map_err(|_| Degraded::OutOfEnum)?;
    let priority: Priority = raw.priority.parse().map_err(|_| Degraded::OutOfEnum)?;

    Ok(Suggestion { category, priority })
}
