use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ConfigError;

/// One serial-attached instrument: its identifier and the device it lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub name: String,
    pub device: String,
}

/// Structure representing the application configuration. Contains the log
/// directory and the set of instruments to read from.
/// Configs are serializable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log_path: PathBuf,
    pub instruments: Vec<InstrumentConfig>,
}

impl Default for Config {
    /// Generate a new Config object with a single conventionally-named instrument
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("./logs"),
            instruments: vec![InstrumentConfig {
                name: String::from("SENSOR_ARRAY_1"),
                device: String::from("/dev/SENSOR_ARRAY_1"),
            }],
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

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Is this name one of the configured instrument identifiers?
    pub fn is_known_instrument(&self, name: &str) -> bool {
        self.instruments.iter().any(|i| i.name == name)
    }

    /// The directory holding all of one instrument's logs
    pub fn instrument_directory(&self, instrument: &str) -> PathBuf {
        self.log_path.join(instrument)
    }

    /// The dated data log path for an instrument, e.g. `logs/X/X_2021-01-01_data.log`
    pub fn data_log_path(&self, instrument: &str, date: &str) -> PathBuf {
        self.instrument_directory(instrument)
            .join(format!("{instrument}_{date}_data.log"))
    }

    /// The error log path for an instrument, e.g. `logs/X/X_error.log`
    pub fn error_log_path(&self, instrument: &str) -> PathBuf {
        self.instrument_directory(instrument)
            .join(format!("{instrument}_error.log"))
    }
}
