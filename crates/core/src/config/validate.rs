use super::{types::Config, ConfigError};

/// Validate a loaded configuration before the service starts.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port must be non-zero".to_string(),
        ));
    }

    if config.database.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "database.path cannot be empty".to_string(),
        ));
    }

    if let Some(classifier) = &config.classifier {
        classifier
            .validate()
            .map_err(ConfigError::ValidationError)?;
    }

    Ok(())
}
