//! Fixed-capacity ring buffer with an incrementally maintained sum.

use core::ops::{AddAssign, SubAssign};

/// Numeric type that can be averaged by a [`RingAccumulator`].
pub trait Sample: Copy + Default + AddAssign + SubAssign {
    /// Divide an accumulated sum by the number of samples it holds.
    ///
    /// Integer types truncate toward zero, floating types divide exactly.
    fn mean(sum: Self, count: usize) -> Self;
}

impl Sample for f32 {
    fn mean(sum: Self, count: usize) -> Self {
        sum / count as f32
    }
}

impl Sample for i32 {
    fn mean(sum: Self, count: usize) -> Self {
        sum / count as i32
    }
}

/// Moving-average window over the last `N` samples.
///
/// Adding to a full window evicts the oldest slot (the one the write cursor is
/// about to overwrite) and subtracts it from the running sum first, so
/// [`average`](Self::average) is O(1) regardless of `N`.
#[derive(Debug, Clone)]
pub struct RingAccumulator<T: Sample, const N: usize> {
    slots: [T; N],
    /// Next slot to write
    head: usize,
    /// Number of valid slots, saturates at `N`
    count: usize,
    /// Sum of the `count` valid slots
    sum: T,
}

impl<T: Sample, const N: usize> Default for RingAccumulator<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sample, const N: usize> RingAccumulator<T, N> {
    pub fn new() -> Self {
        const { assert!(N > 0, "RingAccumulator needs at least one slot") };

        Self {
            slots: [T::default(); N],
            head: 0,
            count: 0,
            sum: T::default(),
        }
    }

    /// Zero all slots and forget every sample.
    pub fn reset(&mut self) {
        self.slots = [T::default(); N];
        self.head = 0;
        self.count = 0;
        self.sum = T::default();
    }

    pub fn add(&mut self, value: T) {
        if self.count == N {
            self.sum -= self.slots[self.head];
        }

        self.slots[self.head] = value;
        self.sum += value;
        self.head = (self.head + 1) % N;

        if self.count < N {
            self.count += 1;
        }
    }

    /// Mean of the valid samples, or zero when the window is empty.
    ///
    /// Callers that need to distinguish "no data yet" from a real zero must
    /// check [`count`](Self::count) first.
    pub fn average(&self) -> T {
        if self.count == 0 {
            return T::default();
        }
        T::mean(self.sum, self.count)
    }

    /// Most recently added sample, or zero when the window is empty.
    pub fn latest(&self) -> T {
        if self.count == 0 {
            return T::default();
        }
        self.slots[(self.head + N - 1) % N]
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == N
    }

    pub fn sum(&self) -> T {
        self.sum
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_tracks_valid_slots() {
        let mut ring = RingAccumulator::<i32, 4>::new();
        let inputs = [5, -3, 12, 7, 100, 1, -40, 9, 9, 0];

        for (calls, &value) in inputs.iter().enumerate() {
            ring.add(value);

            let seen = calls + 1;
            let window_start = seen.saturating_sub(4);
            let expected: i32 = inputs[window_start..seen].iter().sum();

            assert_eq!(ring.sum(), expected, "sum after {seen} adds");
            assert_eq!(ring.count(), seen.min(4));
        }
    }

    #[test]
    fn test_oldest_value_is_evicted() {
        let mut ring = RingAccumulator::<i32, 3>::new();
        ring.add(1000);
        ring.add(10);
        ring.add(20);
        ring.add(30);

        assert!(ring.is_full());
        assert_eq!(ring.count(), 3);
        assert_eq!(ring.average(), 20);
        assert_eq!(ring.latest(), 30);
    }

    #[test]
    fn test_integer_average_truncates() {
        let mut ring = RingAccumulator::<i32, 20>::new();
        ring.add(1);
        ring.add(2);
        assert_eq!(ring.average(), 1);

        ring.add(-6);
        assert_eq!(ring.average(), -1);
    }

    #[test]
    fn test_float_average() {
        let mut ring = RingAccumulator::<f32, 6>::new();
        ring.add(21.0);
        ring.add(22.5);
        assert!((ring.average() - 21.75).abs() < 1e-6);
        assert!(!ring.is_full());
    }

    #[test]
    fn test_empty_window_reports_zero() {
        let ring = RingAccumulator::<f32, 6>::new();
        assert!(ring.is_empty());
        assert_eq!(ring.average(), 0.0);
        assert_eq!(ring.latest(), 0.0);
        assert_eq!(ring.capacity(), 6);
    }

    #[test]
    fn test_latest_follows_head_across_wrap() {
        let mut ring = RingAccumulator::<i32, 2>::new();
        for value in 1..=5 {
            ring.add(value);
            assert_eq!(ring.latest(), value);
        }
        assert_eq!(ring.sum(), 9);
    }

    #[test]
    fn test_reset() {
        let mut ring = RingAccumulator::<i32, 3>::new();
        ring.add(4);
        ring.add(8);
        ring.reset();

        assert_eq!(ring.count(), 0);
        assert_eq!(ring.sum(), 0);
        assert_eq!(ring.average(), 0);

        ring.add(6);
        assert_eq!(ring.average(), 6);
    }
}
