use std::path::PathBuf;
use thiserror::Error;

use super::calibrate::SensorType;

#[derive(Debug, Error)]
pub enum PortReaderError {
    #[error("Serial device {0} is not present on this system")]
    PortNotFound(String),
    #[error("PortReader failed due to serial error: {0}")]
    SerialError(#[from] serialport::Error),
    #[error("PortReader failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("PortReader could not enqueue a line because the consumer is gone")]
    QueueClosed,
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("LogRouter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("LogRouter failed to format a date: {0}")]
    FormatError(#[from] time::error::Format),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("Sensor {0} requires {1} raw values but was given {2}")]
    ArityMismatch(SensorType, usize, usize),
    #[error("Found invalid sensor type keyword: {0}")]
    UnknownSensorType(String),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Unable to find a data file matching date {0} in dir {1:?}")]
    NoMatchingFiles(String, PathBuf),
    #[error("Multiple data files found matching date {0} in dir {1:?}")]
    MultipleMatchingFiles(String, PathBuf),
    #[error("Archiving failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Archiving failed due to zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),
    #[error("Archiving failed to format a date: {0}")]
    FormatError(#[from] time::error::Format),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline failed because no configured instrument could be opened")]
    NoActiveReaders,
    #[error("Pipeline failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}
