//! Quality assessment for sensor readings
//!
//! Maps smoothed values onto the four-step traffic-light scale the display
//! uses to colour each reading.

use crate::sensors::SensorType;
use embedded_graphics::pixelcolor::Rgb565;

/// Quality level of a single reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityLevel {
    /// Healthy range
    Good,
    /// Acceptable, worth watching
    Moderate,
    /// Uncomfortable or unhealthy
    Bad,
    /// Act now (ventilate, leave the room)
    Danger,
}

impl QualityLevel {
    /// Assess a reading in the sensor's own unit (°C, %, ppm, index, µg/m³).
    ///
    /// Temperature and humidity never reach `Danger`; they only have a
    /// comfort band and a tolerable band around it.
    pub fn assess(sensor: SensorType, value: f32) -> Self {
        match sensor {
            SensorType::Temperature => {
                if (18.0..=24.0).contains(&value) {
                    Self::Good
                } else if (15.0..=28.0).contains(&value) {
                    Self::Moderate
                } else {
                    Self::Bad
                }
            }
            SensorType::Humidity => {
                if (40.0..=60.0).contains(&value) {
                    Self::Good
                } else if (30.0..=70.0).contains(&value) {
                    Self::Moderate
                } else {
                    Self::Bad
                }
            }
            // ppm
            SensorType::Co2 => Self::from_upper_bounds(value, [800.0, 1000.0, 1500.0]),
            SensorType::Voc => Self::from_upper_bounds(value, [100.0, 200.0, 300.0]),
            // WHO/EPA style µg/m³ bands
            SensorType::Pm25 => Self::from_upper_bounds(value, [12.0, 35.0, 55.0]),
        }
    }

    /// Exclusive upper bounds for Good, Moderate and Bad; anything above is Danger.
    fn from_upper_bounds(value: f32, bounds: [f32; 3]) -> Self {
        if value < bounds[0] {
            Self::Good
        } else if value < bounds[1] {
            Self::Moderate
        } else if value < bounds[2] {
            Self::Bad
        } else {
            Self::Danger
        }
    }

    /// Display colour of this level
    pub const fn color(self) -> Rgb565 {
        match self {
            Self::Good => Rgb565::new(0, 63, 0),
            Self::Moderate => Rgb565::new(31, 63, 0),
            Self::Bad => Rgb565::new(31, 41, 0),
            Self::Danger => Rgb565::new(31, 0, 0),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::Bad => "Bad",
            Self::Danger => "Danger",
        }
    }
}
