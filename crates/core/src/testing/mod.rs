//! Test doubles for external dependencies.

mod mock_llm;

pub use mock_llm::MockLlmClient;
