//! Minute-resolution history record and its binary layout.
//!
//! Binary format, version 1 (little-endian, 16 bytes):
//! - timestamp: 4 bytes (u32)
//! - temp_x10: 2 bytes (i16)
//! - humidity: 1 byte (u8)
//! - padding: 1 byte
//! - co2: 2 bytes (u16)
//! - pm25: 2 bytes (u16)
//! - voc: 2 bytes (u16)
//! - reserved: 1 byte (u8)
//! - padding: 1 byte
//!
//! The padding bytes mirror the naturally aligned record written by earlier
//! firmware, so flash contents survive an upgrade.

use core::fmt::{Display, Write};

/// Layout version written next to persisted entries
pub const ENTRY_LAYOUT_VERSION: u32 = 1;

/// Timestamps above this are Unix time rather than seconds since boot (Sep 2020)
const WALL_CLOCK_THRESHOLD: u32 = 1_600_000_000;

const SECONDS_PER_DAY: u32 = 86_400;

/// One committed minute of averaged sensor data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Unix seconds when the wall clock was known, otherwise seconds since boot
    pub timestamp: u32,
    /// Temperature in 0.1 °C
    pub temp_x10: i16,
    /// Relative humidity in %
    pub humidity: u8,
    /// CO2 in ppm
    pub co2: u16,
    /// PM2.5 in µg/m³
    pub pm25: u16,
    /// VOC index (1-500)
    pub voc: u16,
    pub reserved: u8,
}

impl HistoryEntry {
    /// Encoded size in bytes
    pub const SIZE: usize = 16;

    /// Pack minute means into an entry.
    ///
    /// Fractions are truncated toward zero and every field saturates at its
    /// range, so a negative CO2 mean is stored as 0 instead of wrapping.
    pub fn from_means(
        timestamp: u32,
        temperature: f32,
        humidity: f32,
        co2: i64,
        voc: i64,
        pm25: i64,
    ) -> Self {
        Self {
            timestamp,
            temp_x10: (temperature * 10.0) as i16,
            humidity: humidity as u8,
            co2: saturate_u16(co2),
            pm25: saturate_u16(pm25),
            voc: saturate_u16(voc),
            reserved: 0,
        }
    }

    /// Temperature in °C
    pub fn temperature(&self) -> f32 {
        self.temp_x10 as f32 / 10.0
    }

    pub fn has_wall_clock_time(&self) -> bool {
        self.timestamp > WALL_CLOCK_THRESHOLD
    }

    /// `HH:MM` (UTC) for wall-clock timestamps, `??:??` for uptime stamps.
    pub fn clock_label(&self) -> heapless::String<8> {
        let mut label = heapless::String::new();
        if self.has_wall_clock_time() {
            let seconds_of_day = self.timestamp % SECONDS_PER_DAY;
            let _ = write!(
                label,
                "{:02}:{:02}",
                seconds_of_day / 3600,
                (seconds_of_day % 3600) / 60
            );
        } else {
            let _ = label.push_str("??:??");
        }
        label
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];

        bytes[0..4].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.temp_x10.to_le_bytes());
        bytes[6] = self.humidity;
        bytes[8..10].copy_from_slice(&self.co2.to_le_bytes());
        bytes[10..12].copy_from_slice(&self.pm25.to_le_bytes());
        bytes[12..14].copy_from_slice(&self.voc.to_le_bytes());
        bytes[14] = self.reserved;

        // Padding bytes 7 and 15 stay zero
        bytes
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            timestamp: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            temp_x10: i16::from_le_bytes([bytes[4], bytes[5]]),
            humidity: bytes[6],
            co2: u16::from_le_bytes([bytes[8], bytes[9]]),
            pm25: u16::from_le_bytes([bytes[10], bytes[11]]),
            voc: u16::from_le_bytes([bytes[12], bytes[13]]),
            reserved: bytes[14],
        }
    }
}

impl Display for HistoryEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[HistoryEntry] {} ts: {}, {:.1}°C, {}%, co2: {} ppm, voc: {}, pm2.5: {} µg/m³",
            self.clock_label(),
            self.timestamp,
            self.temperature(),
            self.humidity,
            self.co2,
            self.voc,
            self.pm25
        )
    }
}

fn saturate_u16(value: i64) -> u16 {
    value.clamp(0, u16::MAX as i64) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_layout_is_pinned() {
        let entry = HistoryEntry {
            timestamp: 0x1122_3344,
            temp_x10: -125,
            humidity: 55,
            co2: 0x0A0B,
            pm25: 0x0C0D,
            voc: 0x0E0F,
            reserved: 0x7F,
        };

        assert_eq!(
            entry.to_bytes(),
            [
                0x44, 0x33, 0x22, 0x11, // timestamp
                0x83, 0xFF, // temp_x10 = -125
                55, 0, // humidity, padding
                0x0B, 0x0A, // co2
                0x0D, 0x0C, // pm25
                0x0F, 0x0E, // voc
                0x7F, 0, // reserved, padding
            ]
        );
        assert_eq!(HistoryEntry::from_bytes(&entry.to_bytes()), entry);
    }

    #[test]
    fn test_padding_is_ignored_on_decode() {
        let mut bytes = HistoryEntry::from_means(60, 20.0, 50.0, 800, 100, 10).to_bytes();
        bytes[7] = 0xAA;
        bytes[15] = 0xBB;

        let entry = HistoryEntry::from_bytes(&bytes);
        assert_eq!(entry.humidity, 50);
        assert_eq!(entry.reserved, 0);
    }

    #[test]
    fn test_means_truncate() {
        let entry = HistoryEntry::from_means(100, 21.37, 48.9, 815, 99, 7);
        assert_eq!(entry.temp_x10, 213);
        assert_eq!(entry.humidity, 48);
        assert_eq!(entry.co2, 815);

        let cold = HistoryEntry::from_means(100, -3.25, 0.0, 0, 0, 0);
        assert_eq!(cold.temp_x10, -32);
        assert!((cold.temperature() + 3.2).abs() < 1e-6);
    }

    #[test]
    fn test_means_saturate() {
        let entry = HistoryEntry::from_means(0, 5000.0, 300.0, 70_000, -4, -1);
        assert_eq!(entry.temp_x10, i16::MAX);
        assert_eq!(entry.humidity, u8::MAX);
        assert_eq!(entry.co2, u16::MAX);
        assert_eq!(entry.voc, 0);
        assert_eq!(entry.pm25, 0);
    }

    #[test]
    fn test_clock_label() {
        let uptime = HistoryEntry {
            timestamp: 3_600,
            ..Default::default()
        };
        assert!(!uptime.has_wall_clock_time());
        assert_eq!(uptime.clock_label().as_str(), "??:??");

        // 2023-11-14 22:13:20 UTC
        let wall = HistoryEntry {
            timestamp: 1_700_000_000,
            ..Default::default()
        };
        assert!(wall.has_wall_clock_time());
        assert_eq!(wall.clock_label().as_str(), "22:13");
    }

    #[test]
    fn test_display() {
        let entry = HistoryEntry::from_means(42, 20.0, 50.0, 800, 100, 10);
        assert_eq!(
            entry.to_string(),
            "[HistoryEntry] ??:?? ts: 42, 20.0°C, 50%, co2: 800 ppm, voc: 100, pm2.5: 10 µg/m³"
        );
    }
}
