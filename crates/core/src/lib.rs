//! Core of the helpdesk ticket service: ticket storage and invariants,
//! filtering, aggregated statistics, advisory LLM classification, and
//! configuration.

pub mod classify;
pub mod config;
pub mod metrics;
pub mod testing;
pub mod ticket;

pub use classify::{
    AnthropicClient, ClassificationService, ClassifierConfig, GeminiClient, LlmClient,
    LlmProvider, Suggestion,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    SanitizedConfig, ServerConfig,
};
pub use ticket::{
    Category, FieldViolation, NewTicket, Priority, SqliteTicketStore, StatsAggregator, Status,
    Ticket, TicketError, TicketFilter, TicketPatch, TicketStats, TicketStore,
};
