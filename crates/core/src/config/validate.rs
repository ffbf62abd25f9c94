use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Discovery and poll intervals are not 0
/// - Telegram has credentials when enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.pipeline_loop.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "loop.interval_secs cannot be 0".to_string(),
        ));
    }

    if config.pipeline_loop.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "loop.poll_interval_secs cannot be 0".to_string(),
        ));
    }

    if config.telegram.enable
        && (config.telegram.bot_token.is_empty() || config.telegram.channel_id.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "telegram.bot_token and telegram.channel_id are required when telegram.enable is set"
                .to_string(),
        ));
    }

    Ok(())
}
