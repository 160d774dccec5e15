//! Rolling 24 hour history of one-minute averages
//!
//! Raw readings are folded into a minute accumulator, committed once per
//! minute into a fixed ring, and the newest hour is periodically written to
//! a [`KeyValueStore`] so it survives a reboot.

use core::fmt::Display;

use alloc::vec::Vec;
use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use super::entry::{ENTRY_LAYOUT_VERSION, HistoryEntry};
use super::kv::{KeyValueStore, StorageError};
use crate::clock::{Clock, elapsed_ms};
use crate::config::HistoryConfig;

/// 24 hours of one-minute entries
pub const HISTORY_ENTRIES: usize = 1440;
/// Entries written to flash per persist cycle (the most recent hour)
pub const PERSIST_WINDOW: usize = 60;
/// Entries between two rows of [`RollingHistoryStore::recent_rows`]
pub const ROW_STRIDE: usize = 10;

pub const HISTORY_NAMESPACE: &str = "sensorhist";
const KEY_VERSION: &str = "ver";
const KEY_HEAD: &str = "head";
const KEY_COUNT: &str = "count";
const KEY_SAVED: &str = "saved";
const KEY_DATA: &str = "data";

const PERSIST_BLOB_LEN: usize = PERSIST_WINDOW * HistoryEntry::SIZE;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Could not allocate the history ring")]
    Allocation,
    #[error("History storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for HistoryError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// Running sums for the minute that has not been committed yet
#[derive(Debug, Clone, Copy, Default)]
struct MinuteAccumulator {
    temperature: f32,
    humidity: f32,
    co2: i64,
    voc: i64,
    pm25: i64,
    samples: u32,
}

impl MinuteAccumulator {
    fn add(&mut self, temperature: f32, humidity: f32, co2: i32, voc: i32, pm25: i32) {
        self.temperature += temperature;
        self.humidity += humidity;
        self.co2 = self.co2.saturating_add(co2 as i64);
        self.voc = self.voc.saturating_add(voc as i64);
        self.pm25 = self.pm25.saturating_add(pm25 as i64);
        self.samples += 1;
    }

    fn to_entry(self, timestamp: u32) -> HistoryEntry {
        let n = self.samples as i64;
        HistoryEntry::from_means(
            timestamp,
            self.temperature / self.samples as f32,
            self.humidity / self.samples as f32,
            self.co2 / n,
            self.voc / n,
            self.pm25 / n,
        )
    }
}

/// Averages over a window of history entries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryAverage {
    pub temperature: f32,
    pub humidity: f32,
    pub co2: i32,
    pub voc: i32,
    pub pm25: i32,
    /// Entries actually averaged; less than requested when history is short
    pub entries: usize,
}

/// Extremes over a window of history entries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryMinMax {
    pub temperature_min: f32,
    pub temperature_max: f32,
    pub humidity_min: f32,
    pub humidity_max: f32,
    pub co2_min: i32,
    pub co2_max: i32,
    /// Entries actually scanned; less than requested when history is short
    pub entries: usize,
}

/// 24 hour minute-resolution history with a bounded flash backup
///
/// Raw measurements are summed by [`add_measurement`](Self::add_measurement);
/// [`update`](Self::update), called every loop iteration, turns those sums
/// into one [`HistoryEntry`] per minute and appends it to a 1440-slot ring,
/// overwriting the oldest entry once a full day is stored.
///
/// ## Persistence
///
/// Every 5 minutes only the newest hour (at most 60 entries, 960 bytes) is
/// written to the key-value store. Writing the full day each cycle would wear
/// out NVS flash, so a restart recovers at most the last hour; anything older
/// is lost.
///
/// ## Lifecycle
///
/// The ring is allocated by [`begin`](Self::begin) and released by
/// [`end`](Self::end). Before `begin` (or after `end`) every mutation is a
/// no-op and every query returns `None`.
pub struct RollingHistoryStore<C: Clock, S: KeyValueStore> {
    clock: C,
    store: S,
    config: HistoryConfig,
    /// Ring of committed entries, `None` while uninitialized
    entries: Option<Vec<HistoryEntry>>,
    /// Next slot to write
    head: usize,
    /// Number of valid entries, saturates at `HISTORY_ENTRIES`
    count: usize,
    minute: MinuteAccumulator,
    last_commit: u32,
    last_persist: u32,
}

impl<C: Clock, S: KeyValueStore> RollingHistoryStore<C, S> {
    pub fn new(clock: C, store: S, config: HistoryConfig) -> Self {
        Self {
            clock,
            store,
            config,
            entries: None,
            head: 0,
            count: 0,
            minute: MinuteAccumulator::default(),
            last_commit: 0,
            last_persist: 0,
        }
    }

    /// Allocate and zero the ring, reset timers, then reload the persisted hour.
    ///
    /// Calling `begin` again without `end` reuses the existing allocation.
    /// Missing or unreadable persisted data is not an error; the history
    /// simply starts empty.
    pub fn begin(&mut self) -> Result<(), HistoryError> {
        match self.entries.as_mut() {
            Some(entries) => entries.fill(HistoryEntry::default()),
            None => {
                let mut entries = Vec::new();
                entries.try_reserve_exact(HISTORY_ENTRIES).map_err(|_| {
                    error!(
                        "[HISTORY] Could not allocate {} bytes for the history ring",
                        HISTORY_ENTRIES * core::mem::size_of::<HistoryEntry>()
                    );
                    HistoryError::Allocation
                })?;
                entries.resize(HISTORY_ENTRIES, HistoryEntry::default());
                self.entries = Some(entries);
            }
        }

        self.head = 0;
        self.count = 0;
        self.minute = MinuteAccumulator::default();

        let now = self.clock.now_ms();
        self.last_commit = now;
        self.last_persist = now;

        if let Err(e) = self.load_from_storage() {
            warn!("[HISTORY] Ignoring persisted history: {}", e);
        }

        info!(
            "[HISTORY] Initialized: {} entries of {} bytes, {} loaded from flash",
            HISTORY_ENTRIES,
            HistoryEntry::SIZE,
            self.count
        );
        Ok(())
    }

    /// Flush the recent window and release the ring.
    pub fn end(&mut self) {
        if self.entries.is_none() {
            return;
        }
        if let Err(e) = self.persist() {
            error!("[HISTORY] Final flush failed: {}", e);
        }
        self.entries = None;
        self.head = 0;
        self.count = 0;
    }

    pub fn is_initialized(&self) -> bool {
        self.entries.is_some()
    }

    /// Fold one raw measurement into the current minute.
    pub fn add_measurement(&mut self, temperature: f32, humidity: f32, co2: i32, voc: i32, pm25: i32) {
        if self.entries.is_none() {
            return;
        }
        self.minute.add(temperature, humidity, co2, voc, pm25);
    }

    /// Commit the current minute and flush to storage when their intervals have elapsed.
    ///
    /// Returns the entry committed by this call, if any. A minute without any
    /// measurement is not committed; its timer stays armed until data arrives.
    pub fn update(&mut self) -> Option<HistoryEntry> {
        if self.entries.is_none() {
            return None;
        }

        let now = self.clock.now_ms();
        let mut committed = None;

        if elapsed_ms(now, self.last_commit) >= self.config.commit_interval_ms
            && self.minute.samples > 0
        {
            self.last_commit = now;

            let timestamp = self.clock.unix_time().unwrap_or(now / 1000);
            let entry = self.minute.to_entry(timestamp);
            self.push(entry);
            self.minute = MinuteAccumulator::default();

            debug!("[HISTORY] Committed {} ({} entries)", entry, self.count);
            committed = Some(entry);
        }

        if elapsed_ms(now, self.last_persist) >= self.config.persist_interval_ms {
            self.last_persist = now;
            if let Err(e) = self.persist() {
                error!("[HISTORY] Periodic flush failed: {}", e);
            }
        }

        committed
    }

    fn push(&mut self, entry: HistoryEntry) {
        let Some(entries) = self.entries.as_mut() else {
            return;
        };

        entries[self.head] = entry;
        self.head = (self.head + 1) % HISTORY_ENTRIES;
        if self.count < HISTORY_ENTRIES {
            self.count += 1;
        }
    }

    pub fn entry_count(&self) -> usize {
        self.count
    }

    /// Entry at `index`, where 0 is the oldest surviving entry and
    /// `entry_count() - 1` the newest.
    pub fn entry(&self, index: usize) -> Option<HistoryEntry> {
        let entries = self.entries.as_ref()?;
        if index >= self.count {
            return None;
        }

        let slot = (self.head + HISTORY_ENTRIES - self.count + index) % HISTORY_ENTRIES;
        Some(entries[slot])
    }

    pub fn latest_entry(&self) -> Option<HistoryEntry> {
        self.entry(self.count.checked_sub(1)?)
    }

    /// The newest `min(minutes, entry_count())` entries, oldest first.
    fn window(&self, minutes: usize) -> Option<impl Iterator<Item = HistoryEntry> + '_> {
        if self.entries.is_none() || self.count == 0 || minutes == 0 {
            return None;
        }

        let used = minutes.min(self.count);
        Some((self.count - used..self.count).filter_map(|i| self.entry(i)))
    }

    /// Average over the last `minutes` entries, clamped to the entries available.
    pub fn average(&self, minutes: usize) -> Option<HistoryAverage> {
        let mut temperature = 0.0f32;
        let mut humidity = 0.0f32;
        let mut co2 = 0i64;
        let mut voc = 0i64;
        let mut pm25 = 0i64;
        let mut entries = 0usize;

        for e in self.window(minutes)? {
            temperature += e.temperature();
            humidity += e.humidity as f32;
            co2 += e.co2 as i64;
            voc += e.voc as i64;
            pm25 += e.pm25 as i64;
            entries += 1;
        }

        let n = entries as i64;
        Some(HistoryAverage {
            temperature: temperature / entries as f32,
            humidity: humidity / entries as f32,
            co2: (co2 / n) as i32,
            voc: (voc / n) as i32,
            pm25: (pm25 / n) as i32,
            entries,
        })
    }

    /// Minimum and maximum over the last `minutes` entries, clamped to the entries available.
    pub fn min_max(&self, minutes: usize) -> Option<HistoryMinMax> {
        let mut window = self.window(minutes)?;
        let first = window.next()?;

        let mut result = HistoryMinMax {
            temperature_min: first.temperature(),
            temperature_max: first.temperature(),
            humidity_min: first.humidity as f32,
            humidity_max: first.humidity as f32,
            co2_min: first.co2 as i32,
            co2_max: first.co2 as i32,
            entries: 1,
        };

        for e in window {
            let t = e.temperature();
            let h = e.humidity as f32;
            let co2 = e.co2 as i32;

            result.temperature_min = result.temperature_min.min(t);
            result.temperature_max = result.temperature_max.max(t);
            result.humidity_min = result.humidity_min.min(h);
            result.humidity_max = result.humidity_max.max(h);
            result.co2_min = result.co2_min.min(co2);
            result.co2_max = result.co2_max.max(co2);
            result.entries += 1;
        }

        Some(result)
    }

    /// Every 10th entry of the last `hours` hours, oldest first, for trend listings.
    pub fn recent_rows(&self, hours: usize) -> impl Iterator<Item = HistoryEntry> + '_ {
        let shown = hours.saturating_mul(60).min(self.count);
        (self.count - shown..self.count)
            .step_by(ROW_STRIDE)
            .filter_map(|i| self.entry(i))
    }

    /// Drop every entry in RAM and erase the persisted copy.
    pub fn clear(&mut self) {
        let Some(entries) = self.entries.as_mut() else {
            return;
        };

        entries.fill(HistoryEntry::default());
        self.head = 0;
        self.count = 0;

        if let Err(e) = self.store.clear_namespace(HISTORY_NAMESPACE) {
            error!("[HISTORY] Failed to erase persisted history: {}", e);
        }
        info!("[HISTORY] All history cleared");
    }

    /// Write the newest hour to storage now. Returns the number of entries written.
    pub fn persist(&mut self) -> Result<usize, HistoryError> {
        let Some(entries) = self.entries.as_ref() else {
            return Ok(0);
        };
        if self.count == 0 {
            return Ok(0);
        }

        let saved = self.count.min(PERSIST_WINDOW);
        let start = (self.head + HISTORY_ENTRIES - saved) % HISTORY_ENTRIES;

        let mut blob = [0u8; PERSIST_BLOB_LEN];
        for (i, chunk) in blob.chunks_exact_mut(HistoryEntry::SIZE).take(saved).enumerate() {
            let entry = entries[(start + i) % HISTORY_ENTRIES];
            chunk.copy_from_slice(&entry.to_bytes());
        }

        self.store
            .put_u32(HISTORY_NAMESPACE, KEY_VERSION, ENTRY_LAYOUT_VERSION)?;
        self.store
            .put_u32(HISTORY_NAMESPACE, KEY_HEAD, self.head as u32)?;
        self.store
            .put_u32(HISTORY_NAMESPACE, KEY_COUNT, self.count as u32)?;
        self.store.put_bytes(
            HISTORY_NAMESPACE,
            KEY_DATA,
            &blob[..saved * HistoryEntry::SIZE],
        )?;
        self.store
            .put_u32(HISTORY_NAMESPACE, KEY_SAVED, saved as u32)?;

        debug!("[HISTORY] {} entries written to flash", saved);
        Ok(saved)
    }

    /// Copy the persisted window into the start of the (freshly zeroed) ring.
    fn load_from_storage(&mut self) -> Result<usize, StorageError> {
        // Data written before the version key existed uses layout 1
        let version = self
            .store
            .get_u32(HISTORY_NAMESPACE, KEY_VERSION)?
            .unwrap_or(ENTRY_LAYOUT_VERSION);
        if version != ENTRY_LAYOUT_VERSION {
            warn!("[HISTORY] Unknown persisted layout version {}", version);
            return Ok(0);
        }

        let saved = match self.store.get_u32(HISTORY_NAMESPACE, KEY_SAVED)? {
            Some(n) if n > 0 && n as usize <= PERSIST_WINDOW => n as usize,
            Some(n) => {
                warn!("[HISTORY] Implausible persisted entry count {}", n);
                return Ok(0);
            }
            None => return Ok(0),
        };

        let mut blob = [0u8; PERSIST_BLOB_LEN];
        let Some(read) = self.store.get_bytes(HISTORY_NAMESPACE, KEY_DATA, &mut blob)? else {
            return Ok(0);
        };
        if read != saved * HistoryEntry::SIZE {
            warn!(
                "[HISTORY] Persisted blob is {} bytes, expected {}",
                read,
                saved * HistoryEntry::SIZE
            );
            return Ok(0);
        }

        let Some(entries) = self.entries.as_mut() else {
            return Ok(0);
        };
        for (slot, chunk) in entries.iter_mut().zip(blob[..read].chunks_exact(HistoryEntry::SIZE)) {
            let mut raw = [0u8; HistoryEntry::SIZE];
            raw.copy_from_slice(chunk);
            *slot = HistoryEntry::from_bytes(&raw);
        }

        self.head = saved % HISTORY_ENTRIES;
        self.count = saved;
        info!("[HISTORY] {} entries loaded from flash", saved);
        Ok(saved)
    }

    /// Diagnostic snapshot, `None` while uninitialized.
    pub fn status(&self) -> Option<HistoryStatus> {
        if self.entries.is_none() {
            return None;
        }

        Some(HistoryStatus {
            entries: self.count,
            capacity: HISTORY_ENTRIES,
            pending_samples: self.minute.samples,
            latest: self.latest_entry(),
            last_hour: self.average(60),
        })
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the clock and the key-value store.
    pub fn into_parts(self) -> (C, S) {
        (self.clock, self.store)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryStatus {
    pub entries: usize,
    pub capacity: usize,
    /// Samples accumulated for the minute not yet committed
    pub pending_samples: u32,
    pub latest: Option<HistoryEntry>,
    pub last_hour: Option<HistoryAverage>,
}

impl HistoryStatus {
    pub fn fill_percent(&self) -> f32 {
        self.entries as f32 * 100.0 / self.capacity as f32
    }

    /// RAM used by committed entries, in encoded bytes
    pub fn used_bytes(&self) -> usize {
        self.entries * HistoryEntry::SIZE
    }
}

impl Display for HistoryStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(
            f,
            "[HistoryStatus] entries: {}/{} ({:.1}%), {} KB",
            self.entries,
            self.capacity,
            self.fill_percent(),
            self.used_bytes() / 1024
        )?;
        if let Some(latest) = self.latest {
            writeln!(f, "[HistoryStatus] latest: {}", latest)?;
        }
        if let Some(avg) = self.last_hour {
            writeln!(
                f,
                "[HistoryStatus] 1h average: {:.1}°C, {:.0}%, co2: {} ppm",
                avg.temperature, avg.humidity, avg.co2
            )?;
        }
        Ok(())
    }
}
