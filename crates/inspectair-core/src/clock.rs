//! Time sources used for interval gating and entry timestamps
//!
//! Every component that needs time receives a [`Clock`] instead of reading a
//! global timer, so the filter and history logic runs unchanged against the
//! ESP32 system timer, the desktop simulator, or a test-driven [`ManualClock`].

use core::cell::Cell;

/// Source of monotonic milliseconds and (optionally) wall-clock time.
pub trait Clock {
    /// Free-running millisecond counter. Wraps after ~49.7 days.
    fn now_ms(&self) -> u32;

    /// Unix time in seconds, or `None` while the wall clock is not synchronised.
    fn unix_time(&self) -> Option<u32>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }

    fn unix_time(&self) -> Option<u32> {
        (**self).unix_time()
    }
}

/// Milliseconds elapsed between `since` and `now`, correct across one counter wrap.
#[inline]
pub const fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Whether a gate last opened at `last` may open again at `now`.
///
/// A gate that never opened (`None`) is always open.
#[inline]
pub const fn interval_elapsed(last: Option<u32>, now: u32, interval_ms: u32) -> bool {
    match last {
        None => true,
        Some(last) => elapsed_ms(now, last) >= interval_ms,
    }
}

/// Manually advanced clock for tests and the simulator.
///
/// Interior mutability lets several components share one `&ManualClock`
/// while the driver advances time between calls.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<u32>,
    /// Unix seconds at the moment of synchronisation, paired with `now_ms` at that moment
    wall_anchor: Cell<Option<(u32, u32)>>,
}

impl ManualClock {
    pub const fn new(start_ms: u32) -> Self {
        Self {
            now_ms: Cell::new(start_ms),
            wall_anchor: Cell::new(None),
        }
    }

    pub fn set_ms(&self, now_ms: u32) {
        self.now_ms.set(now_ms);
    }

    /// Advance the millisecond counter, wrapping past `u32::MAX`.
    pub fn advance_ms(&self, delta_ms: u32) {
        self.now_ms.set(self.now_ms.get().wrapping_add(delta_ms));
    }

    /// Synchronise the wall clock so that "now" corresponds to `unix_secs`.
    pub fn set_unix_time(&self, unix_secs: u32) {
        self.wall_anchor.set(Some((unix_secs, self.now_ms.get())));
    }

    /// Drop wall-clock synchronisation (e.g. after NTP loss in a test).
    pub fn clear_unix_time(&self) {
        self.wall_anchor.set(None);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now_ms.get()
    }

    fn unix_time(&self) -> Option<u32> {
        self.wall_anchor.get().map(|(unix_secs, at_ms)| {
            unix_secs.wrapping_add(elapsed_ms(self.now_ms.get(), at_ms) / 1000)
        })
    }
}
