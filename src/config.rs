use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser};

use crate::error::ConfigError;
use crate::storage::LogTarget;

pub const DEFAULT_LOG_DIRECTORY: &str = "/opt/davis/logs";
pub const DEFAULT_PID_FILE: &str = "/run/davis-logger.pid";
const LOG_FILENAME: &str = "davis.log";

/// Command line options. Every option can also be set through the
/// environment or a `.env` file.
#[derive(Debug, Clone, Parser)]
#[command(name = "davis-logger", version, about = "Poll a Davis weather console and log one CSV row")]
pub struct Cli {
    /// Serial device of the console; searched by USB id when omitted
    #[arg(short = 't', long, env = "DAVIS_DEVICE")]
    pub device: Option<String>,

    /// Directory for the log files, created when missing
    #[arg(short = 'd', long, env = "DAVIS_LOG_DIRECTORY", default_value = DEFAULT_LOG_DIRECTORY)]
    pub directory: PathBuf,

    /// Increase diagnostic output (repeat for raw bytes)
    #[arg(short = 'e', long = "debug", action = ArgAction::Count)]
    pub debug: u8,

    /// Include the current date in the log file name
    #[arg(short = 'f', long, env = "DAVIS_DATE_FILENAME")]
    pub date_filename: bool,

    /// Also append every row to latest.csv in the log directory
    #[arg(short = 'l', long, env = "DAVIS_LOG_TO_LATEST")]
    pub latest: bool,

    /// Report wind speed in km/h instead of m/s
    #[arg(short = 'w', long, env = "DAVIS_WIND_KMH")]
    pub kmh: bool,

    /// Rotate wind direction by 180 degrees (anemometer arm pointing south)
    #[arg(short = 'z', long, env = "DAVIS_ROTATE_WIND")]
    pub rotate_wind: bool,

    /// Multiplier applied to the barometer reading
    #[arg(short = 'b', long, env = "DAVIS_BARO_CALIBRATION", default_value_t = 1.0)]
    pub barometer_calibration: f32,

    #[arg(short = 'p', long, env = "DAVIS_PID_FILE", default_value = DEFAULT_PID_FILE)]
    pub pid_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindSpeedUnit {
    #[default]
    MetresPerSecond,
    KilometresPerHour,
}

impl WindSpeedUnit {
    pub fn label(self) -> &'static str {
        match self {
            WindSpeedUnit::MetresPerSecond => "m/s",
            WindSpeedUnit::KilometresPerHour => "km/h",
        }
    }
}

/// Read-only inputs of one decode call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeConfig {
    pub verbosity: u8,
    pub barometer_calibration: f32,
    pub wind_speed_unit: WindSpeedUnit,
    pub rotate_wind_direction: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            barometer_calibration: 1.0,
            wind_speed_unit: WindSpeedUnit::MetresPerSecond,
            rotate_wind_direction: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StationConfig {
    pub device: Option<String>,
    pub log_directory: PathBuf,
    pub date_filename: bool,
    pub log_to_latest: bool,
    pub pid_file: PathBuf,
    pub decode: DecodeConfig,
}

impl Cli {
    pub fn usage() -> String {
        Cli::command().render_usage().to_string()
    }
}

/// Load `.env` into the environment, then parse the command line
pub fn parse_cli() -> Result<Cli, clap::Error> {
    dotenv::dotenv().ok();
    Cli::try_parse()
}

impl StationConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let calibration = cli.barometer_calibration;
        if !calibration.is_finite() || calibration <= 0.0 {
            return Err(ConfigError::InvalidCalibration(calibration));
        }
        if cli.directory.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDirectory);
        }

        let wind_speed_unit = if cli.kmh {
            WindSpeedUnit::KilometresPerHour
        } else {
            WindSpeedUnit::MetresPerSecond
        };

        Ok(StationConfig {
            device: cli.device.filter(|d| !d.trim().is_empty()),
            log_directory: cli.directory,
            date_filename: cli.date_filename,
            log_to_latest: cli.latest,
            pid_file: cli.pid_file,
            decode: DecodeConfig {
                verbosity: cli.debug,
                barometer_calibration: calibration,
                wind_speed_unit,
                rotate_wind_direction: cli.rotate_wind,
            },
        })
    }

    pub fn verbosity(&self) -> u8 {
        self.decode.verbosity
    }

    /// Resolve the log file for a run on `date` (formatted `YYYY-MM-DD`)
    pub fn log_target(&self, date: &str) -> LogTarget {
        let filename = if self.date_filename {
            format!("davis_{}.log", date)
        } else {
            LOG_FILENAME.to_string()
        };

        LogTarget::new(
            self.log_directory.clone(),
            filename,
            self.decode.wind_speed_unit,
            self.log_to_latest,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StationError;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["davis-logger"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_are_metric_and_uncalibrated() {
        let config = StationConfig::from_cli(parse(&[])).unwrap();
        assert_eq!(config.decode, DecodeConfig::default());
        assert_eq!(config.log_directory, PathBuf::from(DEFAULT_LOG_DIRECTORY));
        assert!(config.device.is_none());
        assert!(!config.log_to_latest);
    }

    #[test]
    fn flags_map_onto_decode_config() {
        let cli = parse(&["-w", "-z", "-b", "1.02", "-ee", "-t", "/dev/ttyUSB0"]);
        let config = StationConfig::from_cli(cli).unwrap();
        assert_eq!(config.decode.wind_speed_unit, WindSpeedUnit::KilometresPerHour);
        assert!(config.decode.rotate_wind_direction);
        assert_eq!(config.decode.barometer_calibration, 1.02);
        assert_eq!(config.verbosity(), 2);
        assert_eq!(config.device.as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn unparsable_calibration_is_a_configuration_error() {
        let err = Cli::try_parse_from(["davis-logger", "-b", "abc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = StationError::from(ConfigError::from(err));
        assert!(matches!(err, StationError::Config(ConfigError::InvalidArguments(_))));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn unknown_option_is_a_configuration_error() {
        let err = Cli::try_parse_from(["davis-logger", "-q"]).unwrap_err();
        assert_eq!(StationError::from(ConfigError::from(err)).exit_code(), 1);
    }

    #[test]
    fn help_is_not_a_failure() {
        let err = Cli::try_parse_from(["davis-logger", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn non_positive_calibration_is_invalid() {
        let cli = parse(&["-b", "0"]);
        assert!(matches!(
            StationConfig::from_cli(cli),
            Err(ConfigError::InvalidCalibration(_))
        ));
    }

    #[test]
    fn usage_mentions_program() {
        assert!(Cli::usage().contains("davis-logger"));
    }

    #[test]
    fn dated_filename_uses_date() {
        let cli = parse(&["-f", "-d", "/var/log/davis"]);
        let config = StationConfig::from_cli(cli).unwrap();
        let target = config.log_target("2026-10-18");
        assert_eq!(target.filename, "davis_2026-10-18.log");

        let plain = StationConfig::from_cli(parse(&[])).unwrap();
        assert_eq!(plain.log_target("2026-10-18").filename, "davis.log");
    }
}
