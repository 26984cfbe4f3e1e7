//! Configuration management for the tasklist application.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unparseable values fall back to their default with a warning.

use crate::list::{PreferenceRefresh, TodoListOptions};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite://tasklist.db";

/// Default format for the creation timestamp on the edit screen
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%d %B %Y, %H:%M:%S";

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Invalid configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting has a value the application cannot run with
    #[error("Invalid value for {key}: {reason}")]
    Invalid {
        /// Environment variable name
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Embedded database configuration
    pub database: DatabaseConfig,
    /// How long a deleted task can be restored
    pub undo_window: Duration,
    /// Whether the list re-queries when sort or hide-completed change
    pub preference_refresh: PreferenceRefresh,
    /// `strftime` format for creation timestamps
    pub timestamp_format: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Embedded database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL (`sqlite://path` or `sqlite::memory:`)
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: 4,
            },
            undo_window: Duration::from_millis(4000),
            preference_refresh: PreferenceRefresh::default(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Option<T> {
    let raw = lookup(key)?;
    let value = raw.trim().parse().ok();
    if value.is_none() {
        tracing::warn!(key, value = %raw, "Ignoring unparseable setting");
    }
    value
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first, if present.
    /// Install the tracing subscriber before calling this, so warnings about
    /// unparseable values are not lost.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from `lookup`, which maps a variable name to its value
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            database: DatabaseConfig {
                url: lookup("TASKLIST_DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parsed(&lookup, "TASKLIST_DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(defaults.database.max_connections),
            },
            undo_window: parsed(&lookup, "TASKLIST_UNDO_WINDOW_MS")
                .map_or(defaults.undo_window, Duration::from_millis),
            preference_refresh: parsed(&lookup, "TASKLIST_PREFERENCE_REFRESH")
                .unwrap_or(defaults.preference_refresh),
            timestamp_format: lookup("TASKLIST_TIMESTAMP_FORMAT")
                .unwrap_or(defaults.timestamp_format),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Reject settings the application cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero connection count or a
    /// timestamp format chrono cannot render.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "TASKLIST_DATABASE_MAX_CONNECTIONS",
                reason: "must be at least 1".to_string(),
            });
        }
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Invalid {
                key: "TASKLIST_TIMESTAMP_FORMAT",
                reason: format!("not a valid strftime format: {}", self.timestamp_format),
            });
        }
        Ok(())
    }

    /// Options for the list controller
    #[must_use]
    pub const fn list_options(&self) -> TodoListOptions {
        TodoListOptions {
            undo_window: self.undo_window,
            preference_refresh: self.preference_refresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();

        assert_eq!(config.database.url, "sqlite://tasklist.db");
        assert_eq!(config.undo_window, Duration::from_secs(4));
        assert_eq!(config.preference_refresh, PreferenceRefresh::Live);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn missing_variables_use_defaults() {
        let config = Config::from_lookup(|_| None);
        let defaults = Config::default();

        assert_eq!(config.database.url, defaults.database.url);
        assert_eq!(config.database.max_connections, defaults.database.max_connections);
        assert_eq!(config.undo_window, defaults.undo_window);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let config = Config::from_lookup(|key| match key {
            "TASKLIST_UNDO_WINDOW_MS" => Some("soon".to_string()),
            "TASKLIST_DATABASE_MAX_CONNECTIONS" => Some("-1".to_string()),
            "TASKLIST_PREFERENCE_REFRESH" => Some("sometimes".to_string()),
            _ => None,
        });

        assert_eq!(config.undo_window, Config::default().undo_window);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.preference_refresh, PreferenceRefresh::Live);
    }

    #[test]
    fn variables_override_defaults() {
        let config = Config::from_lookup(|key| match key {
            "TASKLIST_DATABASE_URL" => Some("sqlite::memory:".to_string()),
            "TASKLIST_UNDO_WINDOW_MS" => Some(" 1500 ".to_string()),
            "TASKLIST_PREFERENCE_REFRESH" => Some("frozen".to_string()),
            _ => None,
        });

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.undo_window, Duration::from_millis(1500));
        assert_eq!(config.preference_refresh, PreferenceRefresh::Frozen);
    }

    #[test]
    fn zero_connections_rejected() {
        let mut config = Config::default();
        config.database.max_connections = 0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "TASKLIST_DATABASE_MAX_CONNECTIONS", .. })
        ));
    }

    #[test]
    fn broken_timestamp_format_rejected() {
        let config = Config {
            timestamp_format: "%Q %d".to_string(),
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn list_options_follow_config() {
        let config = Config {
            undo_window: Duration::from_millis(250),
            preference_refresh: PreferenceRefresh::Frozen,
            ..Config::default()
        };

        let options = config.list_options();
        assert_eq!(options.undo_window, Duration::from_millis(250));
        assert_eq!(options.preference_refresh, PreferenceRefresh::Frozen);
    }
}
