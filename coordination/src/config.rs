//! Coordinator configuration
//!
//! Loaded from an optional TOML file, then overridden by environment:
//!
//! - `ESCALATION_STAGE_DELAYS_SECS` — comma-separated delays, e.g. `180,180,240`
//! - `ESCALATION_NOTICE_CAPACITY` — notice bus capacity
//!
//! ```toml
//! notice_capacity = 256
//!
//! [policy]
//! stage_delays_secs = [180, 180, 240]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::escalation::EscalationPolicy;
use crate::events::DEFAULT_CHANNEL_CAPACITY;

pub const ENV_STAGE_DELAYS: &str = "ESCALATION_STAGE_DELAYS_SECS";
pub const ENV_NOTICE_CAPACITY: &str = "ESCALATION_NOTICE_CAPACITY";

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Undelivered notices kept per subscriber before it starts lagging
    pub notice_capacity: usize,
    /// Policy applied to escalations triggered after startup
    pub policy: EscalationPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            notice_capacity: DEFAULT_CHANNEL_CAPACITY,
            policy: EscalationPolicy::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Parse from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load the file if given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_STAGE_DELAYS) {
            let secs = raw
                .split(',')
                .map(|part| {
                    part.trim().parse::<f64>().map_err(|_| {
                        ConfigError::Invalid(format!("{}: bad delay {:?}", ENV_STAGE_DELAYS, part))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            self.policy = EscalationPolicy::from_secs_f64(&secs)?;
        }

        if let Some(raw) = lookup(ENV_NOTICE_CAPACITY) {
            self.notice_capacity = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{}: bad capacity {:?}", ENV_NOTICE_CAPACITY, raw))
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notice_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notice_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
