//! Timing configuration for the filter and the history
//!
//! Window sizes are compile-time constants; only the cadences are tunable.
//! A [`Config`] travels as a postcard blob so it can live next to the history
//! in the key-value store or in a file read by the simulator.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Climate (temperature/humidity) samples are accepted every 10 s
pub const MEASURE_INTERVAL_CLIMATE_MS: u32 = 10_000;
/// Air (CO2/VOC/PM2.5) samples are accepted every 3 s
pub const MEASURE_INTERVAL_AIR_MS: u32 = 3_000;
/// Climate values are pushed to the display once a minute
pub const DISPLAY_INTERVAL_CLIMATE_MS: u32 = 60_000;
/// Air values are pushed to the display every 12 s
pub const DISPLAY_INTERVAL_AIR_MS: u32 = 12_000;

/// One history entry is committed per minute
pub const HISTORY_SAVE_INTERVAL_MS: u32 = 60_000;
/// The recent history window is flushed to flash every 5 minutes
pub const HISTORY_PERSIST_INTERVAL_MS: u32 = 300_000;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config blob could not be decoded")]
    Decode,
    #[error("Config could not be encoded")]
    Encode,
    #[error("Interval `{0}` must be greater than zero")]
    ZeroInterval(&'static str),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    pub climate_measure_interval_ms: u32,
    pub air_measure_interval_ms: u32,
    pub climate_display_interval_ms: u32,
    pub air_display_interval_ms: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            climate_measure_interval_ms: MEASURE_INTERVAL_CLIMATE_MS,
            air_measure_interval_ms: MEASURE_INTERVAL_AIR_MS,
            climate_display_interval_ms: DISPLAY_INTERVAL_CLIMATE_MS,
            air_display_interval_ms: DISPLAY_INTERVAL_AIR_MS,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero(self.climate_measure_interval_ms, "climate_measure_interval_ms")?;
        non_zero(self.air_measure_interval_ms, "air_measure_interval_ms")?;
        non_zero(self.climate_display_interval_ms, "climate_display_interval_ms")?;
        non_zero(self.air_display_interval_ms, "air_display_interval_ms")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    pub commit_interval_ms: u32,
    pub persist_interval_ms: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            commit_interval_ms: HISTORY_SAVE_INTERVAL_MS,
            persist_interval_ms: HISTORY_PERSIST_INTERVAL_MS,
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero(self.commit_interval_ms, "commit_interval_ms")?;
        non_zero(self.persist_interval_ms, "persist_interval_ms")
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub filter: FilterConfig,
    pub history: HistoryConfig,
}

impl Config {
    /// Decode and validate a postcard-encoded config.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Encode)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filter.validate()?;
        self.history.validate()
    }
}

fn non_zero(value: u32, name: &'static str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroInterval(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_firmware_cadence() {
        let config = Config::default();
        assert_eq!(config.filter.climate_measure_interval_ms, 10_000);
        assert_eq!(config.filter.air_measure_interval_ms, 3_000);
        assert_eq!(config.filter.climate_display_interval_ms, 60_000);
        assert_eq!(config.filter.air_display_interval_ms, 12_000);
        assert_eq!(config.history.commit_interval_ms, 60_000);
        assert_eq!(config.history.persist_interval_ms, 300_000);
    }

    #[test]
    fn test_postcard_blob_is_decoded() {
        let mut config = Config::default();
        config.filter.air_display_interval_ms = 5_000;
        config.history.persist_interval_ms = 600_000;

        let bytes = config.to_vec().unwrap();
        assert_eq!(Config::from_bytes(&bytes), Ok(config));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut config = Config::default();
        config.history.commit_interval_ms = 0;

        let bytes = config.to_vec().unwrap();
        assert_eq!(
            Config::from_bytes(&bytes),
            Err(ConfigError::ZeroInterval("commit_interval_ms"))
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(Config::from_bytes(&[0xFF]), Err(ConfigError::Decode));
    }
}
