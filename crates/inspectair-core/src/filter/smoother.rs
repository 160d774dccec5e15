use core::fmt::Display;

use log::info;

use super::ring::{RingAccumulator, Sample};
use crate::clock::{Clock, interval_elapsed};
use crate::config::FilterConfig;

/// 6 samples × 10 s = 60 s smoothing window for temperature and humidity
pub const CLIMATE_WINDOW: usize = 6;
/// 20 samples × 3 s = 60 s smoothing window for CO2, VOC and PM2.5
pub const AIR_WINDOW: usize = 20;

/// The values most recently latched for display
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothedReadings {
    pub temperature: f32,
    pub humidity: f32,
    pub co2: i32,
    pub voc: i32,
    pub pm25: i32,
}

struct ClimateChannel {
    temperature: RingAccumulator<f32, CLIMATE_WINDOW>,
    humidity: RingAccumulator<f32, CLIMATE_WINDOW>,
    last_measure: Option<u32>,
    last_display: Option<u32>,
}

impl ClimateChannel {
    fn new() -> Self {
        Self {
            temperature: RingAccumulator::new(),
            humidity: RingAccumulator::new(),
            last_measure: None,
            last_display: None,
        }
    }
}

struct AirChannel {
    co2: RingAccumulator<i32, AIR_WINDOW>,
    voc: RingAccumulator<i32, AIR_WINDOW>,
    pm25: RingAccumulator<i32, AIR_WINDOW>,
    last_measure: Option<u32>,
    last_display: Option<u32>,
}

impl AirChannel {
    fn new() -> Self {
        Self {
            co2: RingAccumulator::new(),
            voc: RingAccumulator::new(),
            pm25: RingAccumulator::new(),
            last_measure: None,
            last_display: None,
        }
    }
}

/// Moving-average filter that decouples the sensor cadence from the display cadence
///
/// Readings are split into two independent channels:
///
/// - **Climate** (temperature, humidity): slow and noisy. One sample is kept
///   every 10 s and the display is refreshed once a minute.
/// - **Air** (CO2, VOC, PM2.5): faster moving. One sample is kept every 3 s and
///   the display is refreshed every 12 s.
///
/// Samples arriving before a channel's measurement interval has elapsed are
/// dropped. The `should_update_*` polls are "poll and latch": a `true` result
/// recomputes the cached smoothed values, which the `smoothed_*` accessors then
/// return until the next latch.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut filter = MeasurementSmoother::new(&clock, FilterConfig::default());
/// filter.begin();
///
/// // Every loop iteration
/// filter.add_climate_measurement(temperature, humidity);
/// filter.add_air_measurement(co2, voc, pm25);
/// if filter.should_update_air_display() {
///     draw_air(filter.smoothed_co2(), filter.smoothed_voc(), filter.smoothed_pm25());
/// }
/// ```
pub struct MeasurementSmoother<C: Clock> {
    clock: C,
    config: FilterConfig,
    climate: ClimateChannel,
    air: AirChannel,
    display: SmoothedReadings,
}

impl<C: Clock> MeasurementSmoother<C> {
    pub fn new(clock: C, config: FilterConfig) -> Self {
        Self {
            clock,
            config,
            climate: ClimateChannel::new(),
            air: AirChannel::new(),
            display: SmoothedReadings::default(),
        }
    }

    /// Reset both channels, their timers and the latched display values.
    pub fn begin(&mut self) {
        self.climate = ClimateChannel::new();
        self.air = AirChannel::new();
        self.display = SmoothedReadings::default();

        info!("[FILTER] Sensor filter initialized");
        info!(
            "[FILTER] Climate: measure every {}s, display every {}s",
            self.config.climate_measure_interval_ms / 1000,
            self.config.climate_display_interval_ms / 1000
        );
        info!(
            "[FILTER] Air: measure every {}s, display every {}s",
            self.config.air_measure_interval_ms / 1000,
            self.config.air_display_interval_ms / 1000
        );
    }

    pub fn add_climate_measurement(&mut self, temperature: f32, humidity: f32) {
        let now = self.clock.now_ms();
        let interval = self.config.climate_measure_interval_ms;
        if !interval_elapsed(self.climate.last_measure, now, interval) {
            return;
        }

        self.climate.last_measure = Some(now);
        self.climate.temperature.add(temperature);
        self.climate.humidity.add(humidity);
    }

    pub fn add_air_measurement(&mut self, co2: i32, voc: i32, pm25: i32) {
        let now = self.clock.now_ms();
        if !interval_elapsed(self.air.last_measure, now, self.config.air_measure_interval_ms) {
            return;
        }

        self.air.last_measure = Some(now);
        self.air.co2.add(co2);
        self.air.voc.add(voc);
        self.air.pm25.add(pm25);
    }

    /// Returns `true` at most once per climate display interval, latching the
    /// current temperature/humidity averages when it does.
    pub fn should_update_climate_display(&mut self) -> bool {
        let now = self.clock.now_ms();
        let interval = self.config.climate_display_interval_ms;
        if !interval_elapsed(self.climate.last_display, now, interval) {
            return false;
        }
        // Nothing to show yet, keep the gate open for the first sample
        if self.climate.temperature.is_empty() {
            return false;
        }

        self.climate.last_display = Some(now);
        self.display.temperature = self.climate.temperature.average();
        self.display.humidity = self.climate.humidity.average();
        true
    }

    /// Returns `true` at most once per air display interval, latching the
    /// current CO2/VOC/PM2.5 averages when it does.
    pub fn should_update_air_display(&mut self) -> bool {
        let now = self.clock.now_ms();
        if !interval_elapsed(self.air.last_display, now, self.config.air_display_interval_ms) {
            return false;
        }
        if self.air.co2.is_empty() {
            return false;
        }

        self.air.last_display = Some(now);
        self.display.co2 = self.air.co2.average();
        self.display.voc = self.air.voc.average();
        self.display.pm25 = self.air.pm25.average();
        true
    }

    pub fn smoothed_temperature(&self) -> f32 {
        self.display.temperature
    }

    pub fn smoothed_humidity(&self) -> f32 {
        self.display.humidity
    }

    pub fn smoothed_co2(&self) -> i32 {
        self.display.co2
    }

    pub fn smoothed_voc(&self) -> i32 {
        self.display.voc
    }

    pub fn smoothed_pm25(&self) -> i32 {
        self.display.pm25
    }

    /// All latched values at once, for handing a single snapshot to the UI.
    pub fn smoothed_readings(&self) -> SmoothedReadings {
        self.display
    }

    pub fn raw_temperature(&self) -> f32 {
        self.climate.temperature.latest()
    }

    pub fn raw_humidity(&self) -> f32 {
        self.climate.humidity.latest()
    }

    pub fn raw_co2(&self) -> i32 {
        self.air.co2.latest()
    }

    pub fn raw_voc(&self) -> i32 {
        self.air.voc.latest()
    }

    pub fn raw_pm25(&self) -> i32 {
        self.air.pm25.latest()
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Diagnostic snapshot of every window.
    pub fn status(&self) -> FilterStatus {
        FilterStatus {
            temperature: QuantityStatus::of(&self.climate.temperature),
            humidity: QuantityStatus::of(&self.climate.humidity),
            co2: QuantityStatus::of(&self.air.co2),
            voc: QuantityStatus::of(&self.air.voc),
            pm25: QuantityStatus::of(&self.air.pm25),
        }
    }
}

/// Raw value, window average and fill level of one smoothed quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantityStatus<T> {
    pub raw: T,
    pub average: T,
    pub samples: usize,
    pub capacity: usize,
}

impl<T: Sample> QuantityStatus<T> {
    fn of<const N: usize>(ring: &RingAccumulator<T, N>) -> Self {
        Self {
            raw: ring.latest(),
            average: ring.average(),
            samples: ring.count(),
            capacity: ring.capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStatus {
    pub temperature: QuantityStatus<f32>,
    pub humidity: QuantityStatus<f32>,
    pub co2: QuantityStatus<i32>,
    pub voc: QuantityStatus<i32>,
    pub pm25: QuantityStatus<i32>,
}

impl Display for FilterStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let t = &self.temperature;
        let h = &self.humidity;
        writeln!(
            f,
            "[FilterStatus] temperature: raw {:.1}°C, avg {:.1}°C ({}/{} samples)",
            t.raw, t.average, t.samples, t.capacity
        )?;
        writeln!(
            f,
            "[FilterStatus] humidity: raw {:.0}%, avg {:.0}% ({}/{} samples)",
            h.raw, h.average, h.samples, h.capacity
        )?;
        for (name, q) in [("co2", &self.co2), ("voc", &self.voc), ("pm2.5", &self.pm25)] {
            writeln!(
                f,
                "[FilterStatus] {}: raw {}, avg {} ({}/{} samples)",
                name, q.raw, q.average, q.samples, q.capacity
            )?;
        }
        Ok(())
    }
}
