//! TOML configuration loading for the ATC workspace.
//!
//! A single `atc.toml` drives every binary. Missing file means compiled
//! defaults; present-but-invalid values are rejected with structured
//! errors so a typo never silently degrades the simulation.

use crate::consts::{
    DEFAULT_CONGESTION_HORIZON_S, DEFAULT_LOG_DIR, REGISTRY_WAIT_ATTEMPTS,
    REGISTRY_WAIT_INTERVAL_MS, RELAY_IDLE_SLEEP_MS,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading / validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`AtcConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A field holds a value outside its permitted range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime configuration shared by every ATC binary.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AtcConfig {
    /// Directory for subsystem log files.
    pub log_dir: PathBuf,
    /// Fleet seed file consumed by the radar process.
    pub fleet_file: Option<PathBuf>,
    /// Initial congestion horizon [s].
    pub congestion_horizon_s: u32,
    /// Registry population wait: attempt count.
    pub registry_attempts: u32,
    /// Registry population wait: interval between attempts [ms].
    pub registry_retry_ms: u64,
    /// Relay sleep while the command ring is empty [ms].
    pub relay_idle_sleep_ms: u64,
    /// Pause between supervisor launch phases [ms].
    pub launch_settle_ms: u64,
}

impl Default for AtcConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            fleet_file: None,
            congestion_horizon_s: DEFAULT_CONGESTION_HORIZON_S,
            registry_attempts: REGISTRY_WAIT_ATTEMPTS,
            registry_retry_ms: REGISTRY_WAIT_INTERVAL_MS,
            relay_idle_sleep_ms: RELAY_IDLE_SLEEP_MS,
            launch_settle_ms: 1000,
        }
    }
}

impl AtcConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: AtcConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. `None` or a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.congestion_horizon_s == 0 {
            return Err(ConfigError::Invalid {
                field: "congestion_horizon_s",
                reason: "must be at least 1 second".into(),
            });
        }
        if self.registry_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "registry_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.relay_idle_sleep_ms == 0 || self.relay_idle_sleep_ms > 10_000 {
            return Err(ConfigError::Invalid {
                field: "relay_idle_sleep_ms",
                reason: format!("{} outside 1..=10000", self.relay_idle_sleep_ms),
            });
        }
        Ok(())
    }
}
