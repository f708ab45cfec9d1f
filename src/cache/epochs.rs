//! Epoch management and temperature estimation.
//!
//! Observed object ids are recorded in the current epoch's hit set. When
//! that set saturates it is archived under a unique increasing timestamp
//! and a fresh set takes its place. An object's temperature combines a
//! full-strength boost for presence in the current epoch with geometrically
//! decayed contributions from the most recent historical epochs, read off a
//! precomputed grade table.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::cache::hitset::HitSet;
use crate::cache::histogram::MICRO_UNIT;
use crate::config::TieringConfig;

/// Score contribution of a hit in the current (un-archived) epoch.
pub const CURRENT_EPOCH_GRADE: u64 = MICRO_UNIT;

/// Tracks the current epoch's hit set plus an archive of past epochs.
#[derive(Debug)]
pub struct EpochTracker {
    current: HitSet,
    /// Archived epochs keyed by creation timestamp, oldest first.
    history: BTreeMap<u64, HitSet>,
    /// `grade_table[i]` scores a hit in the i-th most recent archived epoch.
    grade_table: Vec<u32>,
    hit_set_capacity: usize,
    hit_set_fpp: f64,
    retained_epochs: usize,
    search_last_n: usize,
}

impl EpochTracker {
    pub fn new(config: &TieringConfig) -> Self {
        Self {
            current: HitSet::new(config.hit_set_capacity, config.hit_set_fpp),
            history: BTreeMap::new(),
            grade_table: build_grade_table(config.hit_set_count, config.hit_set_grade_decay_rate),
            hit_set_capacity: config.hit_set_capacity,
            hit_set_fpp: config.hit_set_fpp,
            retained_epochs: config.hit_set_count,
            search_last_n: config.hit_set_search_last_n,
        }
    }

    /// Mark `id` as touched in the current epoch.
    pub fn record(&mut self, id: u64) {
        self.current.insert(id);
    }

    /// Whether the current epoch's hit set has run out of capacity.
    pub fn needs_rotation(&self) -> bool {
        self.current.is_saturated()
    }

    /// Score for a hit `age` epochs back in the archive; zero past the table.
    pub fn grade(&self, age: usize) -> u32 {
        self.grade_table.get(age).copied().unwrap_or(0)
    }

    /// Estimate how hot `id` is.
    ///
    /// A hit in the current epoch contributes the full base grade. Archived
    /// epochs are then scanned newest-first: the grade index advances with
    /// every epoch scanned, while the search budget is only spent on epochs
    /// that actually report the id, so a sparse history can reach further
    /// back without exceeding the configured number of contributions.
    pub fn temperature(&self, id: u64) -> u64 {
        let mut temp = 0u64;
        if self.current.contains(id) {
            temp = CURRENT_EPOCH_GRADE;
        }
        let mut age = 0usize;
        let mut budget = self.search_last_n;
        for set in self.history.values().rev() {
            if budget == 0 {
                break;
            }
            if set.contains(id) {
                temp += u64::from(self.grade(age));
                budget -= 1;
            }
            age += 1;
        }
        temp
    }

    /// Archive the current hit set and install a fresh one.
    ///
    /// Archive keys are strictly increasing even when rotations land within
    /// the same wall-clock second. The archive is pruned to the configured
    /// number of retained epochs; pruned epochs were already past the grade
    /// table and contributed nothing.
    pub fn rotate(&mut self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let key = match self.history.keys().next_back() {
            Some(&last) if now <= last => last + 1,
            _ => now,
        };

        let fresh = HitSet::new(self.hit_set_capacity, self.hit_set_fpp);
        let archived = std::mem::replace(&mut self.current, fresh);
        self.history.insert(key, archived);

        while self.history.len() > self.retained_epochs {
            self.history.pop_first();
        }

        debug!(epoch_key = key, archived = self.history.len(), "Rotated hit set epoch");
    }

    /// Number of archived epochs currently retained.
    pub fn archived_epochs(&self) -> usize {
        self.history.len()
    }
}

/// Precompute per-epoch-age grades: starting from the base value, each step
/// keeps `1 - decay_rate` of the previous one, truncated to whole points.
fn build_grade_table(epochs: usize, decay_rate: f64) -> Vec<u32> {
    let mut table = Vec::with_capacity(epochs);
    let mut v = MICRO_UNIT as u32;
    for _ in 0..epochs {
        v = (f64::from(v) * (1.0 - decay_rate)) as u32;
        table.push(v);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TieringConfig {
        TieringConfig {
            hit_set_capacity: 100,
            ..TieringConfig::default()
        }
    }

    #[test]
    fn test_grade_table_is_non_increasing() {
        for decay in [0.05, 0.2, 0.4, 0.8, 0.99] {
            let table = build_grade_table(8, decay);
            for pair in table.windows(2) {
                assert!(pair[0] >= pair[1], "decay {decay}: {pair:?}");
            }
        }
    }

    #[test]
    fn test_grade_table_default_decay_values() {
        // decay 0.4: 1_000_000 → 600_000 → 360_000 → 216_000
        let table = build_grade_table(3, 0.4);
        assert_eq!(table, vec![600_000, 360_000, 216_000]);
    }

    #[test]
    fn test_grade_past_table_is_zero() {
        let tracker = EpochTracker::new(&config());
        assert_eq!(tracker.grade(100), 0);
    }

    #[test]
    fn test_current_epoch_hit_scores_base_grade() {
        let mut tracker = EpochTracker::new(&config());
        tracker.record(42);
        assert_eq!(tracker.temperature(42), CURRENT_EPOCH_GRADE);
    }

    #[test]
    fn test_archived_hit_scores_decayed_grade() {
        let mut tracker = EpochTracker::new(&config());
        tracker.record(42);
        tracker.rotate();
        // Most recent archived epoch is age 0.
        assert_eq!(tracker.temperature(42), u64::from(tracker.grade(0)));
    }

    #[test]
    fn test_temperature_sums_current_and_history() {
        let mut tracker = EpochTracker::new(&config());
        tracker.record(42);
        tracker.rotate();
        tracker.record(42);
        tracker.rotate();
        tracker.record(42);

        let expected =
            CURRENT_EPOCH_GRADE + u64::from(tracker.grade(0)) + u64::from(tracker.grade(1));
        assert_eq!(tracker.temperature(42), expected);
    }

    #[test]
    fn test_unknown_id_is_cold() {
        let mut tracker = EpochTracker::new(&config());
        tracker.record(1);
        tracker.rotate();
        tracker.record(2);
        assert_eq!(tracker.temperature(999), 0);
    }

    #[test]
    fn test_history_pruned_to_retained_count() {
        let cfg = config();
        let mut tracker = EpochTracker::new(&cfg);
        for i in 0..20u64 {
            tracker.record(i);
            tracker.rotate();
        }
        assert_eq!(tracker.archived_epochs(), cfg.hit_set_count);
    }

    #[test]
    fn test_rotation_keys_never_collide() {
        let mut tracker = EpochTracker::new(&config());
        // Many rotations within one wall-clock second must all archive.
        for i in 0..3u64 {
            tracker.record(i);
            tracker.rotate();
        }
        assert_eq!(tracker.archived_epochs(), 3);
    }
}
