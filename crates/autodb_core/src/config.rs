//! Database connection settings.
//!
//! # Invariants
//! - Missing fields fall back to [`DbConfig::default`].
//! - Environment values are parsed strictly; malformed values are errors.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DATABASE: &str = "AUTODB_DATABASE";
pub const ENV_BUSY_TIMEOUT_MS: &str = "AUTODB_BUSY_TIMEOUT_MS";
pub const ENV_FOREIGN_KEYS: &str = "AUTODB_FOREIGN_KEYS";

const DEFAULT_DATABASE: &str = "autodb.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { key, value } => write!(f, "invalid value `{value}` for {key}"),
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid { .. } => None,
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

/// Connection settings shared by every connection a context opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// SQLite database file.
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_busy_timeout_ms(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    pub fn with_foreign_keys(mut self, foreign_keys: bool) -> Self {
        self.foreign_keys = foreign_keys;
        self
    }

    /// Reads `AUTODB_DATABASE`, `AUTODB_BUSY_TIMEOUT_MS` and
    /// `AUTODB_FOREIGN_KEYS`, defaulting each one that is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DbConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DATABASE).filter(|value| !value.trim().is_empty()) {
            config.path = PathBuf::from(path.trim());
        }

        if let Some(value) = lookup(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_BUSY_TIMEOUT_MS,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(ENV_FOREIGN_KEYS) {
            config.foreign_keys = parse_flag(&value).ok_or(ConfigError::Invalid {
                key: ENV_FOREIGN_KEYS,
                value: value.clone(),
            })?;
        }

        Ok(config)
    }

    /// Reads settings from a JSON object; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(ConfigError::Parse)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DbConfig, ENV_BUSY_TIMEOUT_MS, ENV_DATABASE, ENV_FOREIGN_KEYS};
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn unset_variables_keep_defaults() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DbConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = DbConfig::from_lookup(lookup(&[
            (ENV_DATABASE, " /var/lib/app/data.db "),
            (ENV_BUSY_TIMEOUT_MS, "250"),
            (ENV_FOREIGN_KEYS, "off"),
        ]))
        .unwrap();
        assert_eq!(config.path, PathBuf::from("/var/lib/app/data.db"));
        assert_eq!(config.busy_timeout_ms, 250);
        assert!(!config.foreign_keys);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = DbConfig::from_lookup(lookup(&[(ENV_BUSY_TIMEOUT_MS, "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: ENV_BUSY_TIMEOUT_MS,
                ..
            }
        ));

        let err = DbConfig::from_lookup(lookup(&[(ENV_FOREIGN_KEYS, "maybe")])).unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn json_file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"path\": \"shop.db\", \"foreign_keys\": false}}").unwrap();

        let config = DbConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.path, PathBuf::from("shop.db"));
        assert!(!config.foreign_keys);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn missing_json_file_reports_path() {
        let err = DbConfig::from_json_file("/nonexistent/autodb.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/autodb.json"));
    }
}
