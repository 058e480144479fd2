//! Core configuration parsing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML did not parse or did not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// `max_commit_retries` must allow at least one attempt.
    #[error("max_commit_retries must be >= 1")]
    ZeroRetryBudget,
}

/// Configuration for the governance core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoreConfig {
    /// Attempts per mutating operation before a commit conflict is
    /// surfaced to the caller.
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,

    /// Path of the `SQLite` ledger database, when the bundled adapter
    /// is used.
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
}

const fn default_max_commit_retries() -> u32 {
    3
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: default_max_commit_retries(),
            ledger_path: None,
        }
    }
}

impl CoreConfig {
    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or the retry budget is
    /// zero.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_commit_retries == 0 {
            return Err(ConfigError::ZeroRetryBudget);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_config() {
        let config = CoreConfig::from_toml("").expect("parse");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.max_commit_retries, 3);
    }

    #[test]
    fn explicit_values_parse() {
        let config = CoreConfig::from_toml(
            r#"
            max_commit_retries = 5
            ledger_path = "/var/lib/mandat/governance.db"
            "#,
        )
        .expect("parse");
        assert_eq!(config.max_commit_retries, 5);
        assert_eq!(
            config.ledger_path.as_deref(),
            Some(Path::new("/var/lib/mandat/governance.db"))
        );
    }

    #[test]
    fn zero_retry_budget_is_refused() {
        let err = CoreConfig::from_toml("max_commit_retries = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroRetryBudget));
    }
}
