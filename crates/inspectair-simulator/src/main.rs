//! Headless desktop simulator for the InspectAir air-quality monitor.
//!
//! Drives the inspectair-core filter and minute history with synthetic sensor
//! data on a simulated clock, so hours of operation run in well under a second.
//! History is persisted to a directory on disk and reloaded on a simulated
//! reboot at the end of the run.
//!
//! # Options
//!
//! | Flag                  | Meaning                                           |
//! |-----------------------|---------------------------------------------------|
//! | `--hours N`           | Simulated run time (default 3)                    |
//! | `--state DIR`         | Persistence directory (default: temp dir)         |
//! | `--config FILE`       | Postcard-encoded config to load                   |
//! | `--write-config FILE` | Write the default config as postcard and exit     |
//! | `--wall-clock`        | Stamp entries with Unix time instead of uptime    |
//! | `--fresh`             | Erase persisted history after boot                |
//!
//! Set `RUST_LOG=debug` to also see every display redraw.

mod file_store;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use log::{debug, info, warn};
use thiserror::Error;

use inspectair_core::app_state::{AppError, AppState, Tick};
use inspectair_core::clock::ManualClock;
use inspectair_core::config::{Config, ConfigError};
use inspectair_core::metrics::QualityLevel;
use inspectair_core::sensors::{SensorReadings, SensorType};
use inspectair_core::storage::StorageError;

use file_store::FileStore;

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Main loop period of the firmware.
const LOOP_INTERVAL_MS: u32 = 2_000;

/// The VOC index algorithm reports 0 for this long after power-up.
const VOC_WARMUP_MS: u32 = 45_000;

const DEFAULT_HOURS: u32 = 3;

// ---------------------------------------------------------------------------
// Errors and arguments
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
enum SimError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Storage error: {0}")]
    Storage(StorageError),
    #[error("Config error: {0}")]
    Config(ConfigError),
    #[error("{0}")]
    App(AppError),
}

impl SimError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Run the InspectAir core over simulated hours of synthetic sensor data
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Simulated run time in hours
    #[arg(long, default_value_t = DEFAULT_HOURS)]
    hours: u32,

    /// Persistence directory (default: inspectair-sim in the temp dir)
    #[arg(long, value_name = "DIR")]
    state: Option<PathBuf>,

    /// Postcard-encoded config to load
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the default config as postcard and exit
    #[arg(long, value_name = "FILE")]
    write_config: Option<PathBuf>,

    /// Stamp entries with Unix time instead of uptime
    #[arg(long)]
    wall_clock: bool,

    /// Erase persisted history after boot
    #[arg(long)]
    fresh: bool,
}

impl Args {
    fn state_dir(&self) -> PathBuf {
        self.state
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("inspectair-sim"))
    }

    fn load_config(&self) -> Result<Config, SimError> {
        let Some(path) = &self.config else {
            return Ok(Config::default());
        };
        let bytes = std::fs::read(path).map_err(SimError::io(path))?;
        Config::from_bytes(&bytes).map_err(SimError::Config)
    }
}

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// Generates synthetic sensor readings that vary over time.
struct MockSensorGenerator {
    /// Simulated milliseconds since power-up.
    uptime_ms: u32,
}

impl MockSensorGenerator {
    fn new() -> Self {
        Self { uptime_ms: 0 }
    }

    /// Advance the internal clock and return a new snapshot.
    fn next_readings(&mut self, dt_ms: u32) -> SensorReadings {
        self.uptime_ms = self.uptime_ms.saturating_add(dt_ms);
        let t = f64::from(self.uptime_ms) / 1000.0;

        // Temperature: 19–25 °C with a slow drift
        let temperature = 22.0 + 2.5 * (t / 1800.0).sin() + 0.3 * (t / 97.0).cos();

        // Humidity: 35–60 % on a different period
        let humidity = 47.0 + 10.0 * (t / 2700.0).sin() + 1.5 * (t / 53.0).cos();

        // CO₂: occupancy cycle peaking around 1400 ppm
        let co2 = 900.0 + 450.0 * (t / 3600.0).sin() + 40.0 * (t / 41.0).cos();

        // VOC index: 0 until the gas algorithm has warmed up
        let voc = if self.uptime_ms < VOC_WARMUP_MS {
            0.0
        } else {
            110.0 + 60.0 * (t / 1200.0).sin()
        };

        // PM2.5: mostly clean with a cooking spike each hour
        let pm25 = 8.0 + 30.0 * (t / 3600.0 * std::f64::consts::TAU).sin().max(0.0).powi(8);

        // Every 50th loop the CO₂ sensor misses its UART frame
        let co2 = (self.uptime_ms % (50 * LOOP_INTERVAL_MS) != 0).then_some(co2 as i32);

        SensorReadings {
            temperature: Some(temperature as f32),
            humidity: Some(humidity as f32),
            co2,
            voc: Some(voc as i32),
            pm25: Some(pm25 as i32),
        }
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

fn log_redraw(tick: &Tick) {
    let s = &tick.smoothed;
    if tick.climate_changed {
        debug!(
            "[DISPLAY] {:.1}°C ({}), {:.0}% ({})",
            s.temperature,
            QualityLevel::assess(SensorType::Temperature, s.temperature).label(),
            s.humidity,
            QualityLevel::assess(SensorType::Humidity, s.humidity).label(),
        );
    }
    if tick.air_changed {
        debug!(
            "[DISPLAY] co2: {} ppm ({}), voc: {} ({}), pm2.5: {} µg/m³ ({})",
            s.co2,
            QualityLevel::assess(SensorType::Co2, s.co2 as f32).label(),
            s.voc,
            QualityLevel::assess(SensorType::Voc, s.voc as f32).label(),
            s.pm25,
            QualityLevel::assess(SensorType::Pm25, s.pm25 as f32).label(),
        );
    }
}

fn log_summary(state: &AppState<&ManualClock, FileStore>) {
    let history = state.history();

    if let Some(status) = history.status() {
        for line in status.to_string().lines() {
            info!("{}", line);
        }
    }
    if let Some(range) = history.min_max(60) {
        info!(
            "[SIM] last {} min: {:.1}..{:.1}°C, co2 {}..{} ppm",
            range.entries, range.temperature_min, range.temperature_max, range.co2_min, range.co2_max
        );
    }

    info!("[SIM] trend rows (every 10 min):");
    for entry in history.recent_rows(1) {
        info!("[SIM]   {}", entry);
    }

    info!("{}", state.filter().status());
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), SimError> {
    env_logger::init();

    let args = Args::parse();

    if let Some(path) = &args.write_config {
        let bytes = Config::default().to_vec().map_err(SimError::Config)?;
        std::fs::write(path, &bytes).map_err(SimError::io(path))?;
        info!("Default config written to {}", path.display());
        return Ok(());
    }

    let config = args.load_config()?;
    let store = FileStore::open(args.state_dir()).map_err(SimError::Storage)?;
    info!("InspectAir simulator, state in {}", store.root().display());

    let clock = ManualClock::new(0);
    if args.wall_clock {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        clock.set_unix_time(u32::try_from(now).unwrap_or(u32::MAX));
    }

    let mut state = AppState::new(&clock, store, config).map_err(SimError::App)?;
    if let Err(e) = state.begin() {
        warn!("History unavailable, running without trends: {}", e);
    }
    if args.fresh {
        state.history_mut().clear();
    }
    info!(
        "Booted with {} history entries",
        state.history().entry_count()
    );

    let mut generator = MockSensorGenerator::new();
    let loops = args.hours.saturating_mul(3_600_000) / LOOP_INTERVAL_MS;
    let mut redraws = 0u32;
    let mut commits = 0u32;

    for _ in 0..loops {
        clock.advance_ms(LOOP_INTERVAL_MS);
        let readings = generator.next_readings(LOOP_INTERVAL_MS);
        state.ingest(&readings);

        let tick = state.tick();
        if tick.needs_redraw() {
            redraws += 1;
            log_redraw(&tick);
        }
        if let Some(entry) = tick.committed {
            commits += 1;
            if commits % 15 == 0 {
                info!("[SIM] committed {}", entry);
            }
        }
    }

    info!(
        "[SIM] {} loops, {} redraws, {} minutes committed",
        loops, redraws, commits
    );
    log_summary(&state);

    // Simulated reboot on the same persistence directory
    let store = state.into_store();
    let mut rebooted = AppState::new(&clock, store, config).map_err(SimError::App)?;
    rebooted.begin().map_err(SimError::App)?;
    info!(
        "[SIM] after reboot: {} entries restored",
        rebooted.history().entry_count()
    );
    rebooted.end();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["inspectair-simulator"]).unwrap();
        assert_eq!(args.hours, DEFAULT_HOURS);
        assert!(!args.wall_clock);
        assert!(!args.fresh);
        assert_eq!(args.state_dir(), std::env::temp_dir().join("inspectair-sim"));
        assert_eq!(args.load_config().unwrap(), Config::default());
    }

    #[test]
    fn test_all_flags() {
        let args = Args::try_parse_from([
            "inspectair-simulator",
            "--hours",
            "26",
            "--state",
            "/tmp/air",
            "--write-config",
            "air.cfg",
            "--wall-clock",
            "--fresh",
        ])
        .unwrap();
        assert_eq!(args.hours, 26);
        assert_eq!(args.state_dir(), PathBuf::from("/tmp/air"));
        assert_eq!(args.write_config, Some(PathBuf::from("air.cfg")));
        assert!(args.wall_clock);
        assert!(args.fresh);
    }

    #[test]
    fn test_bad_arguments_are_rejected() {
        assert!(Args::try_parse_from(["inspectair-simulator", "--hours", "many"]).is_err());
        assert!(Args::try_parse_from(["inspectair-simulator", "--turbo"]).is_err());
    }

    #[test]
    fn test_config_file_errors_keep_their_cause() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.cfg");

        let args = Args::try_parse_from([
            "inspectair-simulator",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        assert!(matches!(args.load_config(), Err(SimError::Io { .. })));

        let mut config = Config::default();
        config.history.commit_interval_ms = 0;
        std::fs::write(&path, config.to_vec().unwrap()).unwrap();
        assert!(matches!(
            args.load_config(),
            Err(SimError::Config(ConfigError::ZeroInterval(_)))
        ));
    }

    #[test]
    fn test_generator_warms_up_voc() {
        let mut generator = MockSensorGenerator::new();
        let first = generator.next_readings(LOOP_INTERVAL_MS);
        assert_eq!(first.voc, Some(0));
        assert_eq!(first.air(), None);
        assert!(first.climate().is_some());

        for _ in 0..(VOC_WARMUP_MS / LOOP_INTERVAL_MS) {
            generator.next_readings(LOOP_INTERVAL_MS);
        }
        assert!(generator.next_readings(LOOP_INTERVAL_MS).voc.is_some_and(|voc| voc > 0));
    }
}
