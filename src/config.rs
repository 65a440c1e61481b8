//! Configuration management for ledgertree

use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default finality horizon, in blocks below the best height.
pub const CUT_OFF_AGE: u64 = 10;

/// Maximum transaction size in bytes (100KB) to prevent DoS
pub const MAX_TRANSACTION_SIZE: usize = 100_000;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    #[serde(default = "default_cut_off_age")]
    pub cut_off_age: u64,
    #[serde(default = "default_max_transaction_size")]
    pub max_transaction_size: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            cut_off_age: default_cut_off_age(),
            max_transaction_size: default_max_transaction_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn tracing_level(&self) -> Result<tracing::Level, ChainError> {
        self.level
            .parse::<tracing::Level>()
            .map_err(|_| ChainError::ConfigError(format!("unknown log level '{}'", self.level)))
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ChainError> {
        let config: Config =
            toml::from_str(s).map_err(|e| ChainError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.chain.cut_off_age == 0 {
            return Err(ChainError::ConfigError(
                "chain.cut_off_age must be at least 1".to_string(),
            ));
        }
        if self.chain.max_transaction_size == 0 {
            return Err(ChainError::ConfigError(
                "chain.max_transaction_size must be greater than zero".to_string(),
            ));
        }
        self.logging.tracing_level()?;
        Ok(())
    }
}

/// Load the configuration at `path`, falling back to defaults when the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let config_str = fs::read_to_string(path)?;
    Config::from_toml_str(&config_str)
}

fn default_cut_off_age() -> u64 {
    CUT_OFF_AGE
}

fn default_max_transaction_size() -> usize {
    MAX_TRANSACTION_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}
