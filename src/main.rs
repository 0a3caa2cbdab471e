mod config;
mod davis;
mod error;
mod models;
mod serial;
mod storage;
mod utils;

use std::io;
use std::process::ExitCode;

use clap::error::ErrorKind;
use log::{error, info, warn, LevelFilter};
use time::{OffsetDateTime, UtcOffset};

use config::{Cli, StationConfig};
use davis::{decode, RawFrame};
use error::{ConfigError, StationError};
use models::{FieldId, SensorReading};
use serial::{find_usb_device, open_console, poll_console, PollSettings};
use storage::{format_record, log_line};
use utils::{format_date, PidLock};

fn level_for(debug: u8) -> LevelFilter {
    match debug {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Run a blocking job on the blocking pool, handing `guard` to it. The guard
/// comes back with the result and is only dropped in the job if the caller
/// stopped waiting.
async fn run_blocking_with<G, T, F>(guard: G, job: F) -> Result<(G, T), StationError>
where
    G: Send + 'static,
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let result = job();
        (guard, result)
    })
    .await
    .map_err(|e| StationError::SerialIo(io::Error::new(io::ErrorKind::Other, e)))
}

async fn run(config: StationConfig, offset: UtcOffset) -> Result<(), StationError> {
    let lock = PidLock::acquire(&config.pid_file)?;
    let verbosity = config.verbosity();

    let device = match &config.device {
        Some(device) => device.clone(),
        None => find_usb_device(verbosity)?,
    };
    info!("Polling Davis console on {}", device);

    // Serial reads block for up to the port timeout; the pid file stays
    // claimed until the port is closed
    let (_lock, frame) = run_blocking_with(lock, move || -> Result<Option<RawFrame>, StationError> {
        let mut port = open_console(&device)?;
        Ok(poll_console(&mut port, &PollSettings::default(), verbosity)?)
    })
    .await?;
    let frame = frame?;

    let reading = match frame {
        Some(frame) => decode(&frame, &config.decode),
        None => {
            warn!("No LOOP packet received from the console, logging unavailable values");
            SensorReading::unavailable()
        }
    };

    // One timestamp for both the file name and the row
    let now = OffsetDateTime::now_utc().to_offset(offset);
    let record = format_record(&reading, &now);
    let target = config.log_target(&format_date(&now));
    log_line(&target, &record, verbosity)?;
    info!("Logged reading to {}", target.log_path().display());

    log_summary(&reading, &config);
    Ok(())
}

fn log_summary(reading: &SensorReading, config: &StationConfig) {
    let show = |field: FieldId| match reading.get(field) {
        Some(value) => format!("{:.2}", value),
        None => "n/a".to_string(),
    };

    info!("Summary:");
    info!("  Outside temperature: {}°C", show(FieldId::OutsideTemperature));
    info!("  Outside humidity: {}%", show(FieldId::OutsideHumidity));
    info!("  Barometer: {} hPa", show(FieldId::Barometer));
    info!(
        "  Wind: {} {} from {}°",
        show(FieldId::WindSpeed),
        config.decode.wind_speed_unit.label(),
        show(FieldId::WindDirection)
    );
    info!("  Rain rate: {} mm/hr", show(FieldId::RainRate));

    let invalid: Vec<&str> = reading.invalid_fields().map(FieldId::label).collect();
    if !invalid.is_empty() {
        warn!("Out of range or unavailable: {}", invalid.join(", "));
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // The platform lookup only works while the process is single threaded
    let local_offset = UtcOffset::current_local_offset();

    let cli = match config::parse_cli() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                return ExitCode::from(StationError::from(ConfigError::from(e)).exit_code());
            }
        },
    };

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(level_for(cli.debug))
        .format_timestamp_secs()
        .init();

    let offset = local_offset.unwrap_or_else(|e| {
        warn!("Could not determine local time zone, using UTC: {}", e);
        UtcOffset::UTC
    });

    // Load configuration
    let config = match StationConfig::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("{}", Cli::usage());
            return ExitCode::from(StationError::from(e).exit_code());
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    tokio::select! {
        result = run(config, offset) => {
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("{}", e);
                    ExitCode::from(e.exit_code())
                }
            }
        }
        Ok(()) = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
            ExitCode::from(130)
        }
    }
}
