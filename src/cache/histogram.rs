//! Power-of-two quantile histogram over observed temperatures.
//!
//! Values are bucketed by bit length: bin `k` counts values whose highest
//! set bit is bit `k` (1-based), with zero in its own bin 0. Bin sizes
//! therefore double as values grow, which keeps the histogram tiny while
//! still answering "how cold is this value relative to everything seen"
//! in millionths of the unit interval.

/// Positions returned by [`Pow2Histogram::position_micro`] are expressed in
/// millionths of the unit interval.
pub const MICRO_UNIT: u64 = 1_000_000;

/// Number of bits needed to represent `v`: 0 for 0, otherwise the 1-based
/// index of the highest set bit.
pub fn cbits(v: u64) -> u32 {
    if v == 0 {
        0
    } else {
        u64::BITS - v.leading_zeros()
    }
}

/// Power-of-two bucketed histogram with rank queries.
///
/// Trailing empty bins are trimmed after every mutation, so two histograms
/// holding the same counts compare equal regardless of insertion history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pow2Histogram {
    /// Per-bin counts; `bins[k]` counts values with bit length `k`.
    bins: Vec<u64>,
}

impl Pow2Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn clear(&mut self) {
        self.bins.clear();
    }

    /// Total number of recorded values.
    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Record one value.
    pub fn add(&mut self, v: u64) {
        let bin = cbits(v) as usize;
        self.expand_to(bin + 1);
        self.bins[bin] += 1;
    }

    /// Merge another histogram's counts into this one, bin-wise.
    pub fn merge(&mut self, other: &Pow2Histogram) {
        self.expand_to(other.bins.len());
        for (bin, count) in self.bins.iter_mut().zip(other.bins.iter()) {
            *bin += count;
        }
        self.contract();
    }

    /// Subtract another histogram's counts from this one, bin-wise.
    /// Counts never go below zero.
    pub fn subtract(&mut self, other: &Pow2Histogram) {
        self.expand_to(other.bins.len());
        for (bin, count) in self.bins.iter_mut().zip(other.bins.iter()) {
            *bin = bin.saturating_sub(*count);
        }
        self.contract();
    }

    /// Exclusive upper bound on every recorded value.
    pub fn upper_bound(&self) -> u64 {
        1u64 << self.bins.len()
    }

    /// Rank of `v` among all recorded values, in millionths.
    ///
    /// Returns `(lower, upper)`: the cumulative fraction of values strictly
    /// below `v`'s bin, and at-or-below it. An empty histogram reports
    /// `(0, MICRO_UNIT)` — every value ranks at the top, which callers read
    /// as "nothing is cold enough to act on".
    pub fn position_micro(&self, v: u64) -> (u64, u64) {
        let bin = cbits(v) as usize;
        let mut lower_sum = 0u64;
        let mut upper_sum = 0u64;
        let mut total = 0u64;
        for (i, count) in self.bins.iter().enumerate() {
            if i <= bin {
                upper_sum += count;
            }
            if i < bin {
                lower_sum += count;
            }
            total += count;
        }
        if total == 0 {
            return (0, MICRO_UNIT);
        }
        (lower_sum * MICRO_UNIT / total, upper_sum * MICRO_UNIT / total)
    }

    fn expand_to(&mut self, len: usize) {
        if len > self.bins.len() {
            self.bins.resize(len, 0);
        }
    }

    fn contract(&mut self) {
        let mut len = self.bins.len();
        while len > 0 && self.bins[len - 1] == 0 {
            len -= 1;
        }
        self.bins.truncate(len);
    }
}
