//! Advisory LLM classification of ticket descriptions.

mod config;
mod llm;
mod service;

pub use config::{ClassifierConfig, LlmProvider};
pub use llm::{
    AnthropicClient, CompletionRequest, CompletionResponse, GeminiClient, LlmClient, LlmError,
};
pub use service::{ClassificationService, Suggestion};
