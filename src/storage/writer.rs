/// Appending CSV rows to the station log with header-once and latest.csv rotation
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use csv::{Terminator, WriterBuilder};
use log::{debug, info, trace, warn};

use crate::config::WindSpeedUnit;
use crate::error::LogError;
use crate::storage::format::{csv_header, Record};

pub const LATEST_FILENAME: &str = "latest.csv";
pub const LATEST_ROTATED_FILENAME: &str = "latest.csv.OLD";

/// Where a row goes and which header starts a fresh file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub directory: PathBuf,
    pub filename: String,
    pub header: Record,
    pub log_to_latest: bool,
}

impl LogTarget {
    /// Target whose header matches the columns written for `unit`
    pub fn new(directory: PathBuf, filename: String, unit: WindSpeedUnit, log_to_latest: bool) -> Self {
        Self {
            directory,
            filename,
            header: csv_header(unit),
            log_to_latest,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    pub fn latest_path(&self) -> PathBuf {
        self.directory.join(LATEST_FILENAME)
    }
}

/// Append `record` to the target log, and to latest.csv when enabled.
///
/// A missing directory or log file starts a new incarnation: the header is
/// written first and, when logging to latest, the previous latest.csv is
/// renamed to latest.csv.OLD so both files start together. A failure on the
/// dated log aborts the call before latest.csv is touched.
pub fn log_line(target: &LogTarget, record: &[String], verbosity: u8) -> Result<(), LogError> {
    let mut rotate = false;

    if !target.directory.is_dir() {
        if verbosity > 0 {
            info!("Log directory doesn't exist. Creating it: {}", target.directory.display());
        }
        fs::create_dir_all(&target.directory).map_err(|e| LogError::DirectoryCreateFailed {
            path: target.directory.clone(),
            source: e,
        })?;
        rotate = true;
    }

    let log_path = target.log_path();
    if verbosity > 1 {
        trace!("Full filename: {}", log_path.display());
    }

    let write_header = !log_path.exists();
    if write_header {
        debug!("Starting new log file {}", log_path.display());
        rotate = true;
    }
    append(&log_path, &target.header, record, write_header)?;

    if target.log_to_latest {
        let latest_path = target.latest_path();
        // A latest.csv that could not be moved aside keeps its header
        let moved = rotate && rotate_latest(&target.directory, verbosity);
        let write_header = moved || !latest_path.exists();
        append(&latest_path, &target.header, record, write_header)?;
    }

    Ok(())
}

/// Rename latest.csv aside. Returns whether latest.csv is gone afterwards;
/// a missing file is expected on first use.
fn rotate_latest(directory: &Path, verbosity: u8) -> bool {
    let from = directory.join(LATEST_FILENAME);
    let to = directory.join(LATEST_ROTATED_FILENAME);

    match fs::rename(&from, &to) {
        Ok(()) => {
            if verbosity > 0 {
                info!("Rotated {} to {}", from.display(), to.display());
            }
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Could not rotate {}: {}", from.display(), e);
            false
        }
    }
}

/// Encode the optional header and the record as newline-terminated CSV
fn encode(header: Option<&[String]>, record: &[String]) -> Result<Vec<u8>, csv::Error> {
    let mut chunk = Vec::new();
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(&mut chunk);
        if let Some(header) = header {
            writer.write_record(header)?;
        }
        writer.write_record(record)?;
        writer.flush()?;
    }
    Ok(chunk)
}

/// Header and row go out in a single write so a failed call never leaves a
/// header without its data.
fn append(path: &Path, header: &[String], record: &[String], write_header: bool) -> Result<(), LogError> {
    let chunk = encode(write_header.then_some(header), record).map_err(|e| LogError::EncodeFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LogError::FileOpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    file.write_all(&chunk).map_err(|e| LogError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
