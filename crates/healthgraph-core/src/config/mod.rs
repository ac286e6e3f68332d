//! Configuration management for healthgraph.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `healthgraph.toml` file
//! 3. User config `~/.config/healthgraph/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Graph store configuration.
    pub store: StoreConfig,

    /// Bundle loading configuration.
    pub loader: LoaderConfig,

    /// Summary and listing configuration.
    pub summary: SummaryConfig,

    /// Log output configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./healthgraph.toml` (project local)
    /// 2. `~/.config/healthgraph/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides apply in every case.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(PROJECT_CONFIG_FILE).exists() {
            return Self::from_file(PROJECT_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE);
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from TOML text without environment overrides.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Used directly by tests so they
    /// do not touch the process environment.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(backend) = lookup(ENV_STORE) {
            self.store.backend = backend.parse()?;
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.store.path = path;
        }
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            self.store.namespace = namespace;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.store.database = database;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.logging.filter = Some(filter);
        }
        self.validate()
    }

    /// Reject values the store cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid("store.namespace must not be empty".into()));
        }
        if self.store.database.trim().is_empty() {
            return Err(ConfigError::Invalid("store.database must not be empty".into()));
        }
        if self.store.backend == StoreBackend::Surreal && self.store.path.trim().is_empty() {
            return Err(ConfigError::Invalid("store.path must not be empty".into()));
        }
        if self.summary.patient_limit == 0 {
            return Err(ConfigError::Invalid("summary.patient_limit must be positive".into()));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Which graph store implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Embedded SurrealDB on RocksDB.
    #[default]
    Surreal,
    /// Process-local, discarded on exit.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "surreal" | "surrealdb" => Ok(Self::Surreal),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid(format!("unknown store backend '{other}'"))),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surreal => write!(f, "surreal"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Graph store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Database directory for the SurrealDB backend.
    pub path: String,

    pub namespace: String,

    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: DEFAULT_DB_PATH.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl StoreConfig {
    /// An in-memory store configuration.
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Self::default()
        }
    }

    /// Get the database path.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// Bundle loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// File extension (without leading dot) of bundle files in a directory.
    pub bundle_extension: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            bundle_extension: DEFAULT_BUNDLE_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Default row limit for patient listing and search.
    pub patient_limit: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            patient_limit: DEFAULT_PATIENT_LIMIT,
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive. `RUST_LOG` wins when set.
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// The filter directive, falling back to the built-in default.
    pub fn filter_or_default(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.backend, StoreBackend::Surreal);
        assert_eq!(config.store.path, DEFAULT_DB_PATH);
        assert_eq!(config.loader.bundle_extension, DEFAULT_BUNDLE_EXTENSION);
        assert_eq!(config.summary.patient_limit, DEFAULT_PATIENT_LIMIT);
        assert_eq!(config.logging.filter_or_default(), DEFAULT_LOG_FILTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_to_toml() {
        let toml_str = Config::default_config_string();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[loader]"));
        assert!(toml_str.contains("[summary]"));
        assert!(toml_str.contains("backend = \"surreal\""));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[store]
backend = "memory"
namespace = "test"

[summary]
patient_limit = 5

[logging]
filter = "debug"
"#;
        let config = Config::from_toml(toml_str).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.namespace, "test");
        assert_eq!(config.store.database, DEFAULT_DATABASE);
        assert_eq!(config.summary.patient_limit, 5);
        assert_eq!(config.logging.filter_or_default(), "debug");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_toml("[summary]\npatient_limit = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[store]\nbackend = \"neo4j\"\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_STORE, "Memory"),
            (ENV_DB_PATH, "/tmp/graph"),
            (ENV_LOG, "trace"),
        ]);
        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.db_path(), PathBuf::from("/tmp/graph"));
        assert_eq!(config.logging.filter.as_deref(), Some("trace"));

        let err = config
            .apply_overrides(|key| (key == ENV_STORE).then(|| "postgres".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("postgres"));
    }
}
