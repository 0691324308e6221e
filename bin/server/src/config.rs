//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the bot, loaded
//! via the `config` crate. An optional TOML file named by `BARBOT_CONFIG`
//! is read first; environment variables override it, with `__` separating
//! nested keys (for example `TELEGRAM__TOKEN` or `CORE__PAGE_SIZE`).

use barbot_conversation::CoreConfig;
use barbot_integration::{MapConfig, YelpConfig};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable naming an optional configuration file.
pub const CONFIG_FILE_ENV: &str = "BARBOT_CONFIG";

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Telegram Bot API settings.
    pub telegram: TelegramConfig,

    /// Yelp Fusion settings.
    pub yelp: YelpConfig,

    /// Static map settings.
    #[serde(default)]
    pub maps: MapConfig,

    /// Session orchestration settings.
    #[serde(default)]
    pub core: CoreConfig,
}

/// Telegram-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather.
    pub token: String,

    /// Base URL of the Bot API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Long-poll timeout for `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_seconds() -> u64 {
    30
}

impl TelegramConfig {
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds)
    }
}

impl ServerConfig {
    /// Loads configuration from the optional file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let file = std::env::var(CONFIG_FILE_ENV).ok();
        Self::load(file.as_deref(), environment())
    }

    fn load(
        file: Option<&str>,
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::new(path, config::FileFormat::Toml));
        }
        builder
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::default()
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("core.categories")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        environment().source(Some(source))
    }

    #[test]
    fn loads_required_settings_from_environment() {
        let config = ServerConfig::load(
            None,
            env(&[("TELEGRAM__TOKEN", "123:abc"), ("YELP__API_KEY", "secret")]),
        )
        .expect("config");

        assert_eq!(config.telegram.token, "123:abc");
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.telegram.poll_timeout(), Duration::from_secs(30));
        assert_eq!(config.yelp.api_key, "secret");
        assert_eq!(config.core, CoreConfig::default());
        assert_eq!(config.maps.zoom, 15);
    }

    #[test]
    fn environment_overrides_nested_core_settings() {
        let config = ServerConfig::load(
            None,
            env(&[
                ("TELEGRAM__TOKEN", "t"),
                ("YELP__API_KEY", "k"),
                ("CORE__PAGE_SIZE", "4"),
                ("CORE__SEARCH_RATE_LIMIT__MAX_REQUESTS", "3"),
            ]),
        )
        .expect("config");

        assert_eq!(config.core.page_size, 4);
        assert_eq!(config.core.search_rate_limit.max_requests, 3);
        assert_eq!(config.core.search_rate_limit.window_seconds, 60);
    }

    #[test]
    fn missing_token_is_an_error() {
        let result = ServerConfig::load(None, env(&[("YELP__API_KEY", "k")]));
        assert!(result.is_err());
    }

    #[test]
    fn file_settings_are_overridden_by_environment() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(
            file,
            r#"
[telegram]
token = "from-file"
poll_timeout_seconds = 5

[yelp]
api_key = "file-key"

[maps]
api_key = "maps-key"

[core]
page_size = 3
categories = ["pubs", "cocktailbars"]
"#
        )
        .expect("write");
        let path = file.path().to_str().expect("utf-8 path");

        let config = ServerConfig::load(Some(path), env(&[("TELEGRAM__TOKEN", "from-env")]))
            .expect("config");

        assert_eq!(config.telegram.token, "from-env");
        assert_eq!(config.telegram.poll_timeout_seconds, 5);
        assert_eq!(config.yelp.api_key, "file-key");
        assert_eq!(config.maps.api_key.as_deref(), Some("maps-key"));
        assert_eq!(config.core.page_size, 3);
        assert!(config.core.categories.contains("cocktailbars"));
        assert_eq!(config.core.marker_cap, 9);
    }
}
