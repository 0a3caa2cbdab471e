/// Error types for configuration, serial polling and log writing
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid configuration, reported before any polling or logging happens
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not use the baro calibration value {0}: expected a finite, positive float")]
    InvalidCalibration(f32),
    #[error("log directory must not be empty")]
    EmptyDirectory,
    #[error("invalid command line: {0}")]
    InvalidArguments(#[from] clap::Error),
}

/// Failures of a single log append. The write is aborted on any of these.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("could not create the log directory {path}: {source}")]
    DirectoryCreateFailed { path: PathBuf, source: io::Error },
    #[error("cannot open logging file {path}: {source}")]
    FileOpenFailed { path: PathBuf, source: io::Error },
    #[error("cannot write to logging file {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
    #[error("cannot encode CSV row for {path}: {source}")]
    EncodeFailed { path: PathBuf, source: csv::Error },
}

#[derive(Debug, Error)]
pub enum StationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("application appears to be already running (pid file {0})")]
    AlreadyRunning(PathBuf),
    #[error("pid file {path}: {source}")]
    PidFile { path: PathBuf, source: io::Error },
    #[error("could not list serial ports: {0}")]
    PortEnumeration(serialport::Error),
    #[error("Davis weather station USB serial device not found, specify the device manually")]
    DeviceNotFound,
    #[error("more than one Davis USB serial device found ({0}), specify the device manually")]
    DuplicateDevice(String),
    #[error("error opening Davis serial line {device}: {source}")]
    SerialOpen {
        device: String,
        source: serialport::Error,
    },
    #[error("serial I/O error: {0}")]
    SerialIo(#[from] io::Error),
    #[error(transparent)]
    Log(#[from] LogError),
}

impl StationError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            StationError::Config(_)
            | StationError::AlreadyRunning(_)
            | StationError::PidFile { .. } => 1,
            StationError::PortEnumeration(_)
            | StationError::DeviceNotFound
            | StationError::DuplicateDevice(_) => 2,
            StationError::SerialOpen { .. } | StationError::SerialIo(_) => 3,
            StationError::Log(_) => 4,
        }
    }
}
