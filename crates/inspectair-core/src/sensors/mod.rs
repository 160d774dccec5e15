//! Sensor-facing data types
//!
//! The AHT20, SGP40, MH-Z19C and PMS5003 drivers live in the firmware; the
//! core only sees the plain values they produce, collected once per loop
//! iteration into a [`SensorReadings`] snapshot.

/// Quantities measured by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    Temperature,
    Humidity,
    Co2,
    Voc,
    Pm25,
}

impl SensorType {
    pub const ALL: [SensorType; 5] = [
        Self::Temperature,
        Self::Humidity,
        Self::Co2,
        Self::Voc,
        Self::Pm25,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Co2 => "CO2",
            Self::Voc => "VOC index",
            Self::Pm25 => "PM2.5",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity => "%",
            Self::Co2 => "ppm",
            Self::Voc => "",
            Self::Pm25 => "µg/m³",
        }
    }
}

/// One loop iteration's worth of raw readings
///
/// A field is `None` when its driver failed or had nothing new to report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReadings {
    /// AHT20 temperature in °C
    pub temperature: Option<f32>,
    /// AHT20 relative humidity in %
    pub humidity: Option<f32>,
    /// MH-Z19C CO2 in ppm
    pub co2: Option<i32>,
    /// SGP40 VOC index
    pub voc: Option<i32>,
    /// PMS5003 PM2.5 (atmospheric) in µg/m³
    pub pm25: Option<i32>,
}

impl SensorReadings {
    /// Temperature and humidity, if both were read.
    pub fn climate(&self) -> Option<(f32, f32)> {
        Some((self.temperature?, self.humidity?))
    }

    /// CO2, VOC and PM2.5, if all were read and the VOC index is ready.
    ///
    /// The SGP40 gas index algorithm reports 0 while it warms up; such a
    /// sample would drag every average toward zero, so it is held back.
    pub fn air(&self) -> Option<(i32, i32, i32)> {
        let voc = self.voc.filter(|&voc| voc_ready(voc))?;
        Some((self.co2?, voc, self.pm25?))
    }
}

/// Valid VOC indices are 1-500; anything lower means the algorithm is not ready.
pub const fn voc_ready(voc: i32) -> bool {
    voc > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> SensorReadings {
        SensorReadings {
            temperature: Some(21.0),
            humidity: Some(45.0),
            co2: Some(650),
            voc: Some(110),
            pm25: Some(7),
        }
    }

    #[test]
    fn test_complete_snapshot() {
        let readings = full();
        assert_eq!(readings.climate(), Some((21.0, 45.0)));
        assert_eq!(readings.air(), Some((650, 110, 7)));
    }

    #[test]
    fn test_missing_values() {
        let readings = SensorReadings {
            humidity: None,
            pm25: None,
            ..full()
        };
        assert_eq!(readings.climate(), None);
        assert_eq!(readings.air(), None);
    }

    #[test]
    fn test_voc_warmup_holds_back_air_sample() {
        for voc in [0, -1] {
            let readings = SensorReadings {
                voc: Some(voc),
                ..full()
            };
            assert_eq!(readings.air(), None);
            assert!(readings.climate().is_some());
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(SensorType::Co2.label(), "CO2");
        assert_eq!(SensorType::Pm25.unit(), "µg/m³");
        assert_eq!(SensorType::ALL.len(), 5);
    }
}
