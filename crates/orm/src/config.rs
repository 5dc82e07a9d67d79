//! Database configuration loaded from environment variables

use std::env;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_URL: &str = "sqlite::memory:";

/// Connection settings for a single database connection
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `sqlite://app.db` or `sqlite::memory:`
    pub url: String,
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
    /// How long a statement waits on a locked database
    pub busy_timeout: Duration,
    /// Log every statement at `info` instead of `debug`
    pub log_statements: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            foreign_keys: true,
            busy_timeout: Duration::from_millis(5000),
            log_statements: false,
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Configuration for the given URL with default settings
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = get_env_or_default("DATABASE_URL", DEFAULT_URL);
        let foreign_keys = parse_bool("DB_FOREIGN_KEYS", &get_env_or_default("DB_FOREIGN_KEYS", "true"))?;

        let busy_timeout = get_env_or_default("DB_BUSY_TIMEOUT_MS", "5000");
        let busy_timeout = busy_timeout
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidValue {
                field: "DB_BUSY_TIMEOUT_MS".to_string(),
                value: busy_timeout.clone(),
                expected: "a number of milliseconds".to_string(),
            })?;

        let log_statements = parse_bool("DB_LOG_STATEMENTS", &get_env_or_default("DB_LOG_STATEMENTS", "false"))?;

        let config = DatabaseConfig {
            url,
            foreign_keys,
            busy_timeout,
            log_statements,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "url".to_string(),
                reason: "Database URL cannot be empty".to_string(),
            });
        }

        if !self.url.starts_with("sqlite:") {
            return Err(ConfigError::ValidationFailed {
                field: "url".to_string(),
                reason: format!("Unsupported database URL '{}', expected a sqlite: URL", self.url),
            });
        }

        Ok(())
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            expected: "true or false".to_string(),
        }),
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: '{value}', expected {expected}")]
    InvalidValue { field: String, value: String, expected: String },

    #[error("Validation failed for {field}: {reason}")]
    ValidationFailed { field: String, reason: String },
}
