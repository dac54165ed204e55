//! Store configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! connection_string = "Data Source=recipes.db;Default Timeout=30"
//! max_retry_count = 3
//! max_batch_size = 10
//! retry_base_delay_ms = 50
//! log_commands = true
//! sensitive_data_logging = false
//! ```
//!
//! `RECIPEBOOK_CONNECTION` in the environment replaces the connection string.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::connection_string::ConnectionString;
use crate::errors::{config_error, io_error, Result};

/// Environment variable overriding `connection_string`
pub const CONNECTION_ENV: &str = "RECIPEBOOK_CONNECTION";

fn default_connection() -> ConnectionString {
    ConnectionString::file("recipes.db")
}

fn default_max_retry_count() -> u32 {
    3
}

fn default_max_batch_size() -> usize {
    10
}

fn default_retry_base_delay_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default = "default_connection")]
    pub connection_string: ConnectionString,

    /// Retries after the first attempt of a save
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,

    /// Upper bound on commands per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_true")]
    pub log_commands: bool,

    /// Include parameter values in command logs
    #[serde(default)]
    pub sensitive_data_logging: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(default_connection())
    }
}

impl StoreConfig {
    pub fn new(connection_string: ConnectionString) -> Self {
        Self {
            connection_string,
            max_retry_count: default_max_retry_count(),
            max_batch_size: default_max_batch_size(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            log_commands: true,
            sensitive_data_logging: false,
        }
    }

    /// Private in-memory store
    pub fn in_memory() -> Self {
        Self::new(ConnectionString::memory())
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn with_max_retry_count(mut self, count: u32) -> Self {
        self.max_retry_count = count;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_sensitive_data_logging(mut self, enabled: bool) -> Self {
        self.sensitive_data_logging = enabled;
        self
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Parse TOML text and validate it
    ///
    /// # Errors
    /// `Configuration` for malformed TOML, unknown fields or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(text)
            .map_err(|e| config_error(format!("invalid store configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, then apply the environment override
    ///
    /// # Errors
    /// `Io` when the file cannot be read, `Configuration` otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| io_error("load_config", e))?;
        Self::from_toml_str(&text)?.with_env_override()
    }

    /// Replace the connection string with `RECIPEBOOK_CONNECTION` when set
    ///
    /// # Errors
    /// `Configuration` when the variable holds an invalid connection string.
    pub fn with_env_override(mut self) -> Result<Self> {
        if let Ok(value) = std::env::var(CONNECTION_ENV) {
            if !value.trim().is_empty() {
                self.connection_string = value.parse()?;
            }
        }
        Ok(self)
    }

    /// # Errors
    /// `Configuration` when the batch size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(config_error("max_batch_size must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection_string::OpenMode;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = StoreConfig::from_toml_str("").unwrap();
        assert_eq!(config.max_retry_count, 3);
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.retry_base_delay(), Duration::from_millis(50));
        assert!(config.log_commands);
        assert!(!config.sensitive_data_logging);
        assert_eq!(config.connection_string.data_source(), Some("recipes.db"));
    }

    #[test]
    fn test_full_toml() {
        let config = StoreConfig::from_toml_str(
            r#"
connection_string = "Data Source=Demo;Mode=Memory;Cache=Shared"
max_retry_count = 5
max_batch_size = 2
retry_base_delay_ms = 1
sensitive_data_logging = true
"#,
        )
        .unwrap();
        assert_eq!(config.connection_string.mode(), OpenMode::Memory);
        assert_eq!(config.max_retry_count, 5);
        assert_eq!(config.max_batch_size, 2);
        assert!(config.sensitive_data_logging);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(StoreConfig::from_toml_str("max_batch_size = 0").is_err());
    }

    #[test]
    fn test_bad_connection_string_rejected() {
        let err = StoreConfig::from_toml_str(r#"connection_string = "Bogus=1""#).unwrap_err();
        assert!(err.to_string().contains("Bogus"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(StoreConfig::from_toml_str("busy = 1").is_err());
    }
}
