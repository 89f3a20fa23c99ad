//! Bot configuration
//!
//! `DISCORD_TOKEN` is the one required setting; everything else has a
//! default and can be overridden through `ECONOMY_*` environment
//! variables (or a `.env` file loaded by the binary).

use config::{ConfigError, Environment};
use std::env;

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Chat-platform authentication token
    pub discord_token: String,

    /// Path of the persisted economy document
    pub data_file: String,

    /// Command prefix, `!` unless overridden
    pub command_prefix: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| ConfigError::NotFound("DISCORD_TOKEN".to_string()))?;

        let settings = config::Config::builder()
            .set_default("data_file", "bot_data.json")?
            .set_default("command_prefix", "!")?
            .add_source(Environment::with_prefix("ECONOMY"))
            .build()?;

        Ok(Self {
            discord_token,
            data_file: settings.get_string("data_file")?,
            command_prefix: settings.get_string("command_prefix")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_reported_by_name() {
        env::remove_var("DISCORD_TOKEN");

        let err = BotConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }
}
