//! Configuration loading helpers.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::size::MIB;

/// Errors returned by configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error while reading config files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Invalid value for a key.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Raw value string.
        value: String,
    },
    /// Unknown configuration key.
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Reader configuration.
///
/// `chunk_size` is the caller's logical record granularity; reads are sized
/// to a multiple of both it and the device sector size. `num_buffers`
/// bounds in-flight reads to `num_buffers - 1`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Logical record granularity in bytes.
    pub chunk_size: u64,
    /// Lower bound for the derived read size in bytes.
    pub min_buffer_size: u64,
    /// Number of pool buffers (at least 2).
    pub num_buffers: usize,
    /// Worker threads for the portable completion backend.
    pub io_workers: usize,
    /// Open the file for unbuffered (direct) access where supported.
    pub direct: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1,
            min_buffer_size: 2 * MIB,
            num_buffers: 4,
            io_workers: 2,
            direct: false,
        }
    }
}

impl ReaderConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load configuration from the `OXIREAD_CONFIG` env var (if set), then
    /// apply `OXIREAD__field` overrides.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var("OXIREAD_CONFIG").ok() {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment overrides in-place.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        for (key, value) in env::vars() {
            let Some(field) = key.strip_prefix("OXIREAD__") else {
                continue;
            };
            let field = field.to_ascii_lowercase();
            let value = value.trim().to_string();
            match field.as_str() {
                "chunk_size" => self.chunk_size = parse(&field, &value)?,
                "min_buffer_size" => self.min_buffer_size = parse(&field, &value)?,
                "num_buffers" => self.num_buffers = parse(&field, &value)?,
                "io_workers" => self.io_workers = parse(&field, &value)?,
                "direct" => self.direct = parse(&field, &value)?,
                _ => return Err(ConfigError::UnknownKey(field)),
            }
        }
        Ok(())
    }

    /// Check the invariants the scheduler relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_buffers < 2 {
            return Err(invalid("num_buffers", self.num_buffers));
        }
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", self.chunk_size));
        }
        if self.min_buffer_size == 0 {
            return Err(invalid("min_buffer_size", self.min_buffer_size));
        }
        if self.io_workers == 0 {
            return Err(invalid("io_workers", self.io_workers));
        }
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}
