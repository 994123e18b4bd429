// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Static parameters of a Hare instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[serde(default)]
pub struct HareConfig {
    /// Number of participants expected in each round's committee.
    pub committee_size: usize,
    /// Messages required for a bundle to count as a quorum.
    pub threshold: usize,
    /// Maximum number of values in a set (`M`).
    pub set_size: usize,
}

impl Default for HareConfig {
    fn default() -> Self {
        Self {
            committee_size: 800,
            threshold: 401,
            set_size: 200,
        }
    }
}

impl HareConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading Hare config from {:?}", path);
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.committee_size == 0 {
            return Err(ConfigError::Invalid("committee-size must be positive".into()));
        }
        if self.threshold == 0 {
            return Err(ConfigError::Invalid("threshold must be positive".into()));
        }
        if self.threshold > self.committee_size {
            return Err(ConfigError::Invalid(format!(
                "threshold {} exceeds committee-size {}",
                self.threshold, self.committee_size
            )));
        }
        if self.set_size == 0 {
            return Err(ConfigError::Invalid("set-size must be positive".into()));
        }
        Ok(())
    }
}
