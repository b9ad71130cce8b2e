//! # Service Configuration
//!
//! Settings shared by the logging setup and the request middleware, loaded
//! from environment variables (and a `.env` file when present).
//!
//! Build one [`Config`] at startup and pass it by reference to whatever needs
//! it; there is no global instance.
//!
//! ```rust,no_run
//! use lib_core::config::Config;
//!
//! let config = Config::load().expect("valid configuration");
//! println!("starting {}", config.service_name);
//! ```
//!
//! | Variable         | Default   | Meaning                                  |
//! |------------------|-----------|------------------------------------------|
//! | `SERVICE_NAME`   | `service` | name attached to log records             |
//! | `LOG_LEVEL`      | `info`    | `tracing` env-filter directive           |
//! | `LOG_FORMAT`     | `json`    | `json` or `pretty`                       |
//! | `LOG_BODY_LIMIT` | `65536`   | max request body bytes captured in logs  |

use lib_utils::envs::{get_env_or, get_env_parse_or};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_LOG_BODY_LIMIT: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),

    #[error("Environment error: {0}")]
    Env(#[from] lib_utils::envs::Error),
}

/// Output format of log records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output for local development.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Pretty => f.write_str("pretty"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub service_name: String,

    /// Env-filter directive, e.g. `info` or `info,sqlx=warn`.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Request bodies larger than this are not captured by the HTTP log.
    pub log_body_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "service".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            log_body_limit: DEFAULT_LOG_BODY_LIMIT,
        }
    }
}

impl Config {
    /// Read `.env` (if any), then the environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let log_format = get_env_or("LOG_FORMAT", "json")
            .parse()
            .map_err(|e| ConfigError::Invalid("LOG_FORMAT", e))?;

        Ok(Self {
            service_name: get_env_or("SERVICE_NAME", &defaults.service_name),
            log_level: get_env_or("LOG_LEVEL", &defaults.log_level),
            log_format,
            log_body_limit: get_env_parse_or("LOG_BODY_LIMIT", defaults.log_body_limit)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::Invalid("SERVICE_NAME", "must not be empty".to_string()));
        }

        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("LOG_LEVEL", "must not be empty".to_string()));
        }

        if self.log_body_limit == 0 {
            return Err(ConfigError::Invalid("LOG_BODY_LIMIT", "must be greater than 0".to_string()));
        }

        Ok(())
    }
}
