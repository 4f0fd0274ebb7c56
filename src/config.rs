//! File-based configuration for the CLI.
//!
//! Every section is optional; missing sections and fields take their
//! defaults. Values are validated on load, so a bad file is rejected
//! before any source is built or thread spawned.

use crate::analysis::QualityThresholds;
use crate::channel::{ChannelError, LinkConfig};
use crate::protocol::{SessionConfig, SessionConfigError};
use crate::source::SourceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration loading and validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
    #[error("invalid session settings: {0}")]
    Session(#[from] SessionConfigError),
    #[error("invalid link settings: {0}")]
    Link(#[from] ChannelError),
    #[error("sample_bits must be at least {min}, got {got}")]
    SampleTooSmall { got: usize, min: usize },
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub initiator_source: SourceConfig,
    #[serde(default)]
    pub responder_source: SourceConfig,
    #[serde(default)]
    pub qualification: QualificationConfig,
}

/// Source qualification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationConfig {
    /// Bits per battery sample.
    pub sample_bits: usize,
    /// Samples drawn before giving up on a source.
    pub max_samples: usize,
    /// Consecutive passing samples required.
    pub min_healthy_streak: u64,
    /// Acceptance criteria per sample.
    pub thresholds: QualityThresholds,
}

impl Default for QualificationConfig {
    fn default() -> Self {
        Self {
            sample_bits: 4096,
            max_samples: 10,
            min_healthy_streak: 3,
            thresholds: QualityThresholds::default(),
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: FileConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.link.validate()?;
        let min = crate::analysis::MIN_SAMPLE_BITS;
        if self.qualification.sample_bits < min {
            return Err(ConfigError::SampleTooSmall {
                got: self.qualification.sample_bits,
                min,
            });
        }
        Ok(())
    }
}
