//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, DatabaseConfig, GatewaySettings, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &BotConfig) -> ConfigResult<()> {
    if config.bot.prefix.is_empty() {
        return Err(ConfigError::validation("Command prefix cannot be empty"));
    }
    if config.bot.prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(
            "Command prefix cannot contain whitespace",
        ));
    }

    validate_gateway_config(&config.gateway)?;
    validate_database_config(&config.database)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates gateway settings.
fn validate_gateway_config(gateway: &GatewaySettings) -> ConfigResult<()> {
    validate_url(&gateway.url, "gateway.url", &["ws://", "wss://"])?;

    if gateway.initial_delay_ms == 0 {
        return Err(ConfigError::validation(
            "Initial reconnect delay must be greater than 0",
        ));
    }

    if gateway.max_delay_ms < gateway.initial_delay_ms {
        return Err(ConfigError::validation(
            "Max reconnect delay must be greater than or equal to initial delay",
        ));
    }

    if !gateway.backoff_multiplier.is_finite() {
        return Err(ConfigError::validation(
            "Backoff multiplier must be a finite number",
        ));
    }

    if gateway.backoff_multiplier < 1.0 {
        return Err(ConfigError::validation(
            "Backoff multiplier must be at least 1.0",
        ));
    }

    Ok(())
}

/// Validates pool settings.
fn validate_database_config(database: &DatabaseConfig) -> ConfigResult<()> {
    validate_url(
        &database.url,
        "database.url",
        &["postgres://", "postgresql://"],
    )?;

    if database.max_connections == 0 {
        return Err(ConfigError::validation(
            "Database max_connections must be greater than 0",
        ));
    }

    if database.acquire_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Database acquire timeout must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

/// Validates a URL against the accepted schemes.
fn validate_url(url: &str, field: &str, schemes: &[&str]) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field(field));
    }

    if !schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {schemes:?}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&BotConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_prefix() {
        let mut config = BotConfig::default();
        config.bot.prefix.clear();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_gateway_url_scheme() {
        let mut config = BotConfig::default();
        config.gateway.url = "https://gateway.discord.gg".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_inverted_delays() {
        let mut config = BotConfig::default();
        config.gateway.initial_delay_ms = 5000;
        config.gateway.max_delay_ms = 1000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_multiplier() {
        let mut config = BotConfig::default();
        config.gateway.backoff_multiplier = 0.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_non_finite_multiplier() {
        for multiplier in [f64::INFINITY, f64::NAN] {
            let mut config = BotConfig::default();
            config.gateway.backoff_multiplier = multiplier;
            assert!(matches!(
                validate_config(&config),
                Err(ConfigError::ValidationError { .. })
            ));
        }
    }

    #[test]
    fn test_validate_zero_connections() {
        let mut config = BotConfig::default();
        config.database.max_connections = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_database_url() {
        let mut config = BotConfig::default();
        config.database.url.clear();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { ref field }) if field == "database.url"
        ));
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = BotConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
    }
}
