//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, LogOutput, LoggingConfig, StorageConfig, TanukiConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &TanukiConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_storage_config(&config.storage)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates bot identity and prefix.
fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.name.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.name"));
    }

    // An empty prefix is allowed and makes every message a command candidate.
    if bot.prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Command prefix cannot contain whitespace: {:?}",
            bot.prefix
        )));
    }

    Ok(())
}

/// Validates storage settings.
fn validate_storage_config(storage: &StorageConfig) -> ConfigResult<()> {
    if !storage.in_memory && storage.path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("storage.path"));
    }
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}
