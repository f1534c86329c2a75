use serde::{Deserialize, Serialize};
use std::path::Path;

use super::analyzer::{Analyzer, AnalyzerConfig};
use super::constants::DEFAULT_NUMBER_OF_CHANNELS;
use super::decoder::Decoder;
use super::error::ConfigError;

/// Structure representing the decoding/analysis configuration.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub n_channels: usize,
    pub n_threads: usize,
    pub analyzer: AnalyzerConfig,
}

impl Default for Config {
    /// A single-threaded config for a 16 channel module with the default analyzer settings
    fn default() -> Self {
        Self {
            n_channels: DEFAULT_NUMBER_OF_CHANNELS,
            n_threads: 1,
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Check for values the decoder and analyzer cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_channels == 0 {
            return Err(ConfigError::InvalidValue(String::from(
                "n_channels must be at least 1",
            )));
        }
        if self.n_threads == 0 {
            return Err(ConfigError::InvalidValue(String::from(
                "n_threads must be at least 1",
            )));
        }
        if self.analyzer.clock_mhz.is_nan() || self.analyzer.clock_mhz <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "clock_mhz must be positive, found {}",
                self.analyzer.clock_mhz
            )));
        }
        if self.analyzer.threshold.is_nan() || self.analyzer.threshold < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "threshold must not be negative, found {}",
                self.analyzer.threshold
            )));
        }
        if self.analyzer.pedestal_flatness.is_nan() || self.analyzer.pedestal_flatness < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "pedestal_flatness must not be negative, found {}",
                self.analyzer.pedestal_flatness
            )));
        }
        Ok(())
    }

    pub fn decoder(&self) -> Decoder {
        Decoder::new(self.analyzer.clock_mhz)
    }

    pub fn analyzer(&self) -> Analyzer {
        Analyzer::new(self.analyzer.clone())
    }
}
