/// Utility functions for timestamps and the single-instance PID file
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::StationError;

/// Format a timestamp for the CSV log as `2017-01-30T15:30:45+1000`
///
/// Falls back to default string representation if formatting fails.
pub fn format_timestamp(dt: &OffsetDateTime) -> String {
    dt.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
    ))
    .unwrap_or_else(|_| dt.to_string())
}

/// Date part used for dated log file names, `2017-01-30`
pub fn format_date(dt: &OffsetDateTime) -> String {
    dt.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| dt.date().to_string())
}

/// Exclusive claim on the PID file for the lifetime of the process.
/// The file is removed again on drop.
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
}

impl PidLock {
    /// Claim `path`. Fails if it names a live process or holds something
    /// other than a PID; a stale file is overwritten.
    pub fn acquire(path: &Path) -> Result<Self, StationError> {
        match fs::read_to_string(path) {
            Ok(contents) => match contents.trim().parse::<u32>() {
                Ok(pid) if process_alive(pid) => {
                    return Err(StationError::AlreadyRunning(path.to_path_buf()))
                }
                Ok(pid) => debug!("Removing stale pid file for process {}", pid),
                Err(_) => return Err(StationError::AlreadyRunning(path.to_path_buf())),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StationError::PidFile {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }

        fs::write(path, format!("{}\n", std::process::id())).map_err(|e| {
            StationError::PidFile {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        Ok(PidLock {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Could not remove pid file {}: {}", self.path.display(), e);
        }
    }
}

fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}
