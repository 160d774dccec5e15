//! Application-wide state and error types for InspectAir

use thiserror_no_std::Error;

use crate::clock::Clock;
use crate::config::{Config, ConfigError};
use crate::filter::{MeasurementSmoother, SmoothedReadings};
use crate::sensors::SensorReadings;
use crate::storage::{HistoryEntry, HistoryError, KeyValueStore, RollingHistoryStore};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("History error: {0}")]
    History(HistoryError),
    #[error("Config error: {0}")]
    Config(ConfigError),
}

impl From<HistoryError> for AppError {
    fn from(e: HistoryError) -> Self {
        Self::History(e)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// What changed during one [`AppState::tick`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tick {
    /// Temperature/humidity were re-latched and should be redrawn
    pub climate_changed: bool,
    /// CO2/VOC/PM2.5 were re-latched and should be redrawn
    pub air_changed: bool,
    /// Latched display values after this tick
    pub smoothed: SmoothedReadings,
    /// Minute committed to the history during this tick
    pub committed: Option<HistoryEntry>,
}

impl Tick {
    pub fn needs_redraw(&self) -> bool {
        self.climate_changed || self.air_changed
    }
}

/// Main application state container
///
/// Owns the display filter and the minute history and feeds both from the
/// same raw readings. The firmware's main loop holds exactly one of these and
/// drives it with [`ingest`](Self::ingest) and [`tick`](Self::tick).
pub struct AppState<C, S>
where
    C: Clock + Clone,
    S: KeyValueStore,
{
    filter: MeasurementSmoother<C>,
    history: RollingHistoryStore<C, S>,
    history_available: bool,
}

impl<C, S> AppState<C, S>
where
    C: Clock + Clone,
    S: KeyValueStore,
{
    pub fn new(clock: C, store: S, config: Config) -> Result<Self, AppError> {
        config.validate()?;

        Ok(Self {
            filter: MeasurementSmoother::new(clock.clone(), config.filter),
            history: RollingHistoryStore::new(clock, store, config.history),
            history_available: false,
        })
    }

    /// Start both components.
    ///
    /// A history allocation failure is returned to the caller, which may keep
    /// running without trends; the filter is usable either way.
    pub fn begin(&mut self) -> Result<(), AppError> {
        self.filter.begin();
        self.history.begin()?;
        self.history_available = true;
        Ok(())
    }

    /// Push one loop iteration's raw readings into the filter and the history.
    pub fn ingest(&mut self, readings: &SensorReadings) {
        let climate = readings.climate();
        let air = readings.air();

        if let Some((temperature, humidity)) = climate {
            self.filter.add_climate_measurement(temperature, humidity);
        }
        if let Some((co2, voc, pm25)) = air {
            self.filter.add_air_measurement(co2, voc, pm25);
        }
        // History entries carry all five fields, so partial snapshots are skipped
        if let (Some((temperature, humidity)), Some((co2, voc, pm25))) = (climate, air) {
            self.history
                .add_measurement(temperature, humidity, co2, voc, pm25);
        }
    }

    /// Run the history timers and poll both display channels.
    pub fn tick(&mut self) -> Tick {
        let committed = self.history.update();
        let climate_changed = self.filter.should_update_climate_display();
        let air_changed = self.filter.should_update_air_display();

        Tick {
            climate_changed,
            air_changed,
            smoothed: self.filter.smoothed_readings(),
            committed,
        }
    }

    /// Flush the history and release it.
    pub fn end(&mut self) {
        self.history.end();
        self.history_available = false;
    }

    pub fn history_available(&self) -> bool {
        self.history_available
    }

    pub fn filter(&self) -> &MeasurementSmoother<C> {
        &self.filter
    }

    pub fn history(&self) -> &RollingHistoryStore<C, S> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut RollingHistoryStore<C, S> {
        &mut self.history
    }

    /// Tear down, handing back the key-value store for reuse.
    pub fn into_store(mut self) -> S {
        self.end();
        let (_, store) = self.history.into_parts();
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn readings(co2: i32, voc: i32) -> SensorReadings {
        SensorReadings {
            temperature: Some(22.0),
            humidity: Some(48.0),
            co2: Some(co2),
            voc: Some(voc),
            pm25: Some(9),
        }
    }

    #[test]
    fn test_first_tick_latches_both_channels() {
        let clock = ManualClock::new(0);
        let mut state = AppState::new(&clock, MemoryStore::new(), Config::default()).unwrap();
        state.begin().unwrap();

        state.ingest(&readings(700, 120));
        let tick = state.tick();

        assert!(tick.climate_changed);
        assert!(tick.air_changed);
        assert!(tick.needs_redraw());
        assert_eq!(tick.smoothed.co2, 700);
        assert_eq!(tick.smoothed.temperature, 22.0);
        assert_eq!(tick.committed, None);

        let idle = state.tick();
        assert!(!idle.needs_redraw());
        assert_eq!(idle.smoothed, tick.smoothed);
    }

    #[test]
    fn test_loop_commits_a_minute() {
        let clock = ManualClock::new(0);
        let mut state = AppState::new(&clock, MemoryStore::new(), Config::default()).unwrap();
        state.begin().unwrap();

        let mut committed = None;
        // Main loop cadence of 2 s
        for _ in 0..=30 {
            state.ingest(&readings(800, 100));
            committed = committed.or(state.tick().committed);
            clock.advance_ms(2_000);
        }

        let entry = committed.unwrap();
        assert_eq!(entry.co2, 800);
        assert_eq!(entry.temp_x10, 220);
        assert_eq!(state.history().entry_count(), 1);
        assert_eq!(state.filter().status().co2.samples, 16);
        assert_eq!(state.filter().status().temperature.samples, 6);
    }

    #[test]
    fn test_voc_warmup_only_feeds_climate() {
        let clock = ManualClock::new(0);
        let mut state = AppState::new(&clock, MemoryStore::new(), Config::default()).unwrap();
        state.begin().unwrap();

        state.ingest(&readings(900, 0));
        clock.advance_ms(60_000);
        let tick = state.tick();

        assert!(tick.climate_changed);
        assert!(!tick.air_changed);
        assert_eq!(tick.committed, None);
        assert_eq!(state.filter().status().co2.samples, 0);
    }

    #[test]
    fn test_store_survives_restart() {
        let clock = ManualClock::new(0);
        let mut state = AppState::new(&clock, MemoryStore::new(), Config::default()).unwrap();
        state.begin().unwrap();

        for _ in 0..3 {
            state.ingest(&readings(650, 90));
            clock.advance_ms(60_000);
            state.tick();
        }
        let store = state.into_store();

        let mut restarted = AppState::new(&clock, store, Config::default()).unwrap();
        restarted.begin().unwrap();
        assert!(restarted.history_available());
        assert_eq!(restarted.history().entry_count(), 3);
    }

    #[test]
    fn test_clearing_history_through_state() {
        let clock = ManualClock::new(0);
        let mut state = AppState::new(&clock, MemoryStore::new(), Config::default()).unwrap();
        state.begin().unwrap();

        for _ in 0..2 {
            state.ingest(&readings(650, 90));
            clock.advance_ms(60_000);
            state.tick();
        }
        state.history_mut().clear();
        assert_eq!(state.history().entry_count(), 0);

        let mut restarted = AppState::new(&clock, state.into_store(), Config::default()).unwrap();
        restarted.begin().unwrap();
        assert_eq!(restarted.history().entry_count(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let clock = ManualClock::new(0);
        let mut config = Config::default();
        config.filter.air_measure_interval_ms = 0;

        let result = AppState::new(&clock, MemoryStore::new(), config);
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::ZeroInterval("air_measure_interval_ms")))
        ));
    }
}
