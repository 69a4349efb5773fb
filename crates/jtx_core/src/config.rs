//! Core runtime configuration.
//!
//! # Responsibility
//! - Collect database, logging, review and task-default settings.
//! - Resolve them from an optional JSON file plus environment overrides.
//!
//! # Invariants
//! - Missing settings fall back to defaults; only malformed input errors.
//! - Environment variables win over the JSON file.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_CONFIG_PATH: &str = "JTX_CONFIG";
pub const ENV_DB_PATH: &str = "JTX_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "JTX_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "JTX_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "jtx_board.sqlite3";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Review prompt cadence in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewPolicy {
    pub days_to_first_request: u32,
    pub days_to_next_request: u32,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            days_to_first_request: 30,
            days_to_next_request: 90,
        }
    }
}

/// Day offsets applied to new tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoDefaults {
    pub start_in_days: Option<u32>,
    pub due_in_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Rolling logs are disabled when unset.
    pub log_dir: Option<PathBuf>,
    pub review: ReviewPolicy,
    pub todo_defaults: TodoDefaults,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            review: ReviewPolicy::default(),
            todo_defaults: TodoDefaults::default(),
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration using `lookup` to read variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = match lookup(ENV_CONFIG_PATH) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Some(path) = lookup(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_json_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ReviewPolicy, ENV_DB_PATH, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            CoreConfig::from_json_str(r#"{"todo_defaults": {"due_in_days": 1}}"#).unwrap();
        assert_eq!(config.todo_defaults.due_in_days, Some(1));
        assert_eq!(config.review, ReviewPolicy::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_DB_PATH, "/tmp/jtx-test.db"), (ENV_LOG_LEVEL, " warn ")]);
        let config =
            CoreConfig::from_lookup(|key| env.get(key).map(|value| value.to_string())).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/jtx-test.db"));
        assert_eq!(config.log_level, "warn");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = CoreConfig::from_lookup(|key| {
            (key == super::ENV_CONFIG_PATH).then(|| "/nonexistent/jtx.json".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/jtx.json"));
    }
}
