use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::classify::{ClassifierConfig, LlmProvider};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Optional; absence disables classification.
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("helpdesk.db")
}

/// Sanitized config for API responses (secrets redacted).
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<SanitizedClassifierConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedClassifierConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// Whether a key is configured; the key itself is never exposed.
    pub api_key_set: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub timeout_secs: u32,
    pub max_tokens: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            classifier: config.classifier.as_ref().map(|c| SanitizedClassifierConfig {
                provider: c.provider,
                model: c.model.clone(),
                api_key_set: c.api_key.as_deref().is_some_and(|k| !k.is_empty()),
                api_base: c.api_base.clone(),
                timeout_secs: c.timeout_secs,
                max_tokens: c.max_tokens,
            }),
        }
    }
}
