//! Price History
//!
//! Session-owned, bounded accumulation of price samples plus the derived
//! statistics shown under the chart.
//!
//! # Design
//!
//! The history keeps:
//! - A FIFO window of the most recent samples (capacity 1800 by default)
//! - The last appended value (`0.0` until the first sample arrives)
//!
//! Both live behind one `parking_lot::Mutex`. `snapshot()` copies them out
//! so rendering never runs while the lock is held.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Default number of samples retained per session.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1800;

/// A single parsed price observation.
pub type PriceSample = f64;

// =============================================================================
// Snapshot
// =============================================================================

/// Independent copy of a session's history, taken under the history lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    /// Samples in arrival order (oldest first).
    pub samples: Vec<PriceSample>,
    /// Most recently appended sample, `0.0` before the first one.
    pub last: PriceSample,
}

impl HistorySnapshot {
    /// Build a snapshot from a sample sequence, taking `last` from its tail.
    #[must_use]
    pub fn from_samples(samples: Vec<PriceSample>) -> Self {
        let last = samples.last().copied().unwrap_or_default();
        Self { samples, last }
    }

    /// Whether no sample has arrived yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Summary statistics over the snapshot.
    #[must_use]
    pub fn stats(&self) -> PriceStats {
        PriceStats::from_samples(&self.samples)
    }

    /// Direction of the most recent move.
    #[must_use]
    pub fn trend(&self) -> Trend {
        Trend::from_samples(&self.samples)
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Min/max and derived change figures over a sample sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceStats {
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// `max - min`.
    pub delta: f64,
    /// Change from first to last sample, in percent of the first.
    pub percent_change: f64,
}

impl PriceStats {
    /// Compute statistics; all fields are zero for an empty sequence.
    #[must_use]
    pub fn from_samples(samples: &[PriceSample]) -> Self {
        let (min, max) = min_max(samples);
        Self {
            min,
            max,
            delta: max - min,
            percent_change: percent_change(samples),
        }
    }
}

/// Returns `(min, max)` over `samples`, or `(0, 0)` when empty.
#[must_use]
pub fn min_max(samples: &[PriceSample]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }

    samples
        .iter()
        .fold((f64::MAX, -f64::MAX), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// `(last - first) / first * 100`, or `0` when empty or `first == 0`.
#[must_use]
pub fn percent_change(samples: &[PriceSample]) -> f64 {
    match (samples.first(), samples.last()) {
        #[allow(clippy::float_cmp)]
        (Some(&first), Some(&last)) if first != 0.0 => (last - first) / first * 100.0,
        _ => 0.0,
    }
}

// =============================================================================
// Trend
// =============================================================================

/// Direction of the latest price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trend {
    /// Last sample above the one before it.
    Up,
    /// Last sample below the one before it.
    Down,
    /// Equal, or fewer than two samples.
    #[default]
    Neutral,
}

impl Trend {
    /// Compare the two most recent samples with exact `f64` ordering.
    #[must_use]
    pub fn from_samples(samples: &[PriceSample]) -> Self {
        match samples {
            [.., prior, last] if last > prior => Self::Up,
            [.., prior, last] if last < prior => Self::Down,
            _ => Self::Neutral,
        }
    }

    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Neutral => "neutral",
        }
    }
}

// =============================================================================
// Price History
// =============================================================================

#[derive(Debug)]
struct HistoryInner {
    samples: VecDeque<PriceSample>,
    last: PriceSample,
}

/// Bounded, synchronized price history for one session.
///
/// # Example
///
/// ```rust
/// use ticker_terminal::domain::history::PriceHistory;
///
/// let history = PriceHistory::with_capacity(2);
/// history.append(100.0);
/// history.append(101.0);
/// history.append(102.0);
///
/// let snapshot = history.snapshot();
/// assert_eq!(snapshot.samples, vec![101.0, 102.0]);
/// assert_eq!(snapshot.last, 102.0);
/// ```
#[derive(Debug)]
pub struct PriceHistory {
    capacity: usize,
    inner: Mutex<HistoryInner>,
}

impl Default for PriceHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceHistory {
    /// Create a history with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a history retaining at most `capacity` samples (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(HistoryInner {
                samples: VecDeque::with_capacity(capacity),
                last: 0.0,
            }),
        }
    }

    /// Maximum number of retained samples.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a sample, evicting the oldest one when full.
    pub fn append(&self, value: PriceSample) {
        let mut inner = self.inner.lock();
        if inner.samples.len() == self.capacity {
            inner.samples.pop_front();
        }
        inner.samples.push_back(value);
        inner.last = value;
    }

    /// Copy the current contents out from under the lock.
    #[must_use]
    pub fn snapshot(&self) -> HistorySnapshot {
        let inner = self.inner.lock();
        HistorySnapshot {
            samples: inner.samples.iter().copied().collect(),
            last: inner.last,
        }
    }

    /// Number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().samples.len()
    }

    /// Whether no sample has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().samples.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn new_history_is_empty() {
        let history = PriceHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), DEFAULT_HISTORY_CAPACITY);

        let snapshot = history.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.last, 0.0);
    }

    #[test]
    fn append_sets_last_value() {
        let history = PriceHistory::new();
        history.append(42_000.5);
        history.append(42_001.25);

        let snapshot = history.snapshot();
        assert_eq!(snapshot.samples, vec![42_000.5, 42_001.25]);
        assert_eq!(snapshot.last, 42_001.25);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let history = PriceHistory::with_capacity(3);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            history.append(v);
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.snapshot().samples, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn default_capacity_bound() {
        let history = PriceHistory::new();
        for i in 0..2000 {
            history.append(f64::from(i));
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.samples.len(), 1800);
        assert_eq!(snapshot.samples[0], 200.0);
        assert_eq!(snapshot.last, 1999.0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let history = PriceHistory::with_capacity(0);
        history.append(1.0);
        history.append(2.0);
        assert_eq!(history.snapshot().samples, vec![2.0]);
    }

    #[test]
    fn snapshot_is_idempotent() {
        let history = PriceHistory::new();
        history.append(10.0);
        history.append(11.0);

        assert_eq!(history.snapshot(), history.snapshot());
    }

    #[test]
    fn snapshot_is_independent_copy() {
        let history = PriceHistory::new();
        history.append(10.0);

        let before = history.snapshot();
        history.append(11.0);

        assert_eq!(before.samples, vec![10.0]);
        assert_eq!(history.snapshot().samples, vec![10.0, 11.0]);
    }

    #[test_case(&[100.0, 110.0], 10.0 ; "ten percent up")]
    #[test_case(&[0.0, 50.0], 0.0 ; "zero first sample")]
    #[test_case(&[], 0.0 ; "empty")]
    #[test_case(&[200.0, 150.0], -25.0 ; "quarter down")]
    #[test_case(&[64.0], 0.0 ; "single sample")]
    fn percent_change_vectors(samples: &[f64], expected: f64) {
        assert_eq!(percent_change(samples), expected);
    }

    #[test_case(&[100.0, 105.0], Trend::Up ; "up")]
    #[test_case(&[105.0, 100.0], Trend::Down ; "down")]
    #[test_case(&[100.0, 100.0], Trend::Neutral ; "flat")]
    #[test_case(&[100.0], Trend::Neutral ; "single sample")]
    #[test_case(&[], Trend::Neutral ; "empty")]
    #[test_case(&[1.0, 9.0, 3.0, 4.0], Trend::Up ; "only last two count")]
    fn trend_vectors(samples: &[f64], expected: Trend) {
        assert_eq!(Trend::from_samples(samples), expected);
    }

    #[test]
    fn trend_uses_parsed_decimal_values() {
        let prior: f64 = "67123.45000000".parse().unwrap();
        let last: f64 = "67123.45000001".parse().unwrap();
        assert_eq!(Trend::from_samples(&[prior, last]), Trend::Up);
    }

    #[test]
    fn stats_over_samples() {
        let stats = PriceStats::from_samples(&[5.0, 2.0, 9.0, 4.0]);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.delta, 7.0);
        assert_eq!(stats.percent_change, -20.0);
    }

    #[test]
    fn stats_empty_is_zero() {
        assert_eq!(min_max(&[]), (0.0, 0.0));
        assert_eq!(PriceStats::from_samples(&[]), PriceStats::default());
    }

    #[test]
    fn trend_labels() {
        assert_eq!(Trend::Up.as_str(), "up");
        assert_eq!(Trend::Down.as_str(), "down");
        assert_eq!(Trend::Neutral.as_str(), "neutral");
    }

    #[test]
    fn concurrent_appends_respect_bound() {
        let history = std::sync::Arc::new(PriceHistory::with_capacity(100));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let history = std::sync::Arc::clone(&history);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        history.append(f64::from(t * 1000 + i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.samples.len(), 100);
        assert_eq!(snapshot.samples.last().copied().unwrap(), snapshot.last);
    }

    proptest! {
        #[test]
        fn history_keeps_last_n_in_order(
            values in proptest::collection::vec(-1.0e6f64..1.0e6, 0..400),
            capacity in 1usize..64,
        ) {
            let history = PriceHistory::with_capacity(capacity);
            for &v in &values {
                history.append(v);
            }

            let snapshot = history.snapshot();
            let expected_len = values.len().min(capacity);
            prop_assert_eq!(snapshot.samples.len(), expected_len);
            prop_assert_eq!(&snapshot.samples[..], &values[values.len() - expected_len..]);
        }
    }
}
