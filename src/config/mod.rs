//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::settings::{GameSettings, SettingsError};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma-separated; `*` allows any
    pub client_origin: String,

    /// Match history service base URL. Unset keeps history in memory.
    pub persistence_url: Option<String>,
    /// Bearer token for the match history service
    pub persistence_token: Option<String>,

    /// Server ticks per second
    pub tick_rate: u32,
    /// Score that ends a match
    pub win_score: u32,
    /// Pause between a point and the next serve
    pub serve_delay: Duration,
    /// How long a new match waits for its participants
    pub join_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let settings = GameSettings::default();
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            client_origin: "*".to_string(),
            persistence_url: None,
            persistence_token: None,
            tick_rate: settings.tick_rate,
            win_score: settings.win_score,
            serve_delay: settings.serve_delay,
            join_timeout: settings.join_timeout,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| defaults.server_addr.to_string())
        };

        let config = Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or(defaults.client_origin),

            persistence_url: optional("PERSISTENCE_URL"),
            persistence_token: optional("PERSISTENCE_TOKEN"),

            tick_rate: parsed("TICK_RATE", defaults.tick_rate)?,
            win_score: parsed("WIN_SCORE", defaults.win_score)?,
            serve_delay: Duration::from_millis(parsed(
                "SERVE_DELAY_MS",
                defaults.serve_delay.as_millis() as u64,
            )?),
            join_timeout: Duration::from_secs(parsed(
                "JOIN_TIMEOUT_SECS",
                defaults.join_timeout.as_secs(),
            )?),
        };

        config.game_settings()?;
        Ok(config)
    }

    /// Match tuning derived from this config, validated
    pub fn game_settings(&self) -> Result<GameSettings, ConfigError> {
        let settings = GameSettings {
            tick_rate: self.tick_rate,
            win_score: self.win_score,
            serve_delay: self.serve_delay,
            join_timeout: self.join_timeout,
            ..GameSettings::default()
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn optional(var: &'static str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },

    #[error("Invalid game settings: {0}")]
    Settings(#[from] SettingsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_yields_default_settings() {
        let settings = Config::default().game_settings().unwrap();
        assert_eq!(settings.tick_rate, 60);
        assert_eq!(settings.win_score, 7);
        assert_eq!(settings.serve_delay_ticks(), 60);
    }

    #[test]
    fn zero_win_score_is_rejected() {
        let config = Config {
            win_score: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.game_settings(),
            Err(ConfigError::Settings(SettingsError::ZeroWinScore))
        ));
    }
}
