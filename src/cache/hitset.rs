//! Approximate membership set recording which objects were touched during
//! the current epoch.
//!
//! Backed by a bloom filter sized for a configured capacity and false
//! positive rate: membership tests may report false positives but never
//! false negatives. A countdown tracks first-time insertions — an insert
//! only consumes capacity when the filter did not already report the id —
//! and once it reaches zero the set is saturated: further inserts are
//! silent no-ops and the owner is expected to rotate in a fresh set.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A fixed-capacity epoch hit set.
#[derive(Debug, Clone)]
pub struct HitSet {
    /// Bloom bit array, packed into 64-bit words.
    bits: Vec<u64>,
    num_bits: usize,
    num_hashes: usize,
    /// First-time insertions this epoch can still absorb.
    remaining: usize,
    capacity: usize,
}

impl HitSet {
    /// Create a hit set that accepts up to `capacity` first-time ids, with
    /// the bloom array sized for the given false positive rate.
    pub fn new(capacity: usize, false_positive_rate: f64) -> Self {
        let n = capacity.max(1);
        let num_bits = optimal_num_bits(n, false_positive_rate);
        let num_hashes = optimal_num_hashes(n, num_bits);
        Self {
            bits: vec![0; num_bits.div_ceil(64)],
            num_bits,
            num_hashes,
            remaining: capacity,
            capacity,
        }
    }

    /// Record that `id` was observed this epoch.
    ///
    /// The first insertion of a given id consumes one unit of capacity;
    /// re-inserting an id the filter already reports is free. Once capacity
    /// is exhausted this is a no-op — callers watch [`HitSet::is_saturated`]
    /// and rotate.
    pub fn insert(&mut self, id: u64) {
        if self.remaining == 0 || self.contains(id) {
            return;
        }
        for i in 0..self.num_hashes {
            let bit = self.bit_index(id, i);
            self.bits[bit / 64] |= 1u64 << (bit % 64);
        }
        self.remaining -= 1;
    }

    /// Probable membership: false positives possible, false negatives not.
    pub fn contains(&self, id: u64) -> bool {
        (0..self.num_hashes).all(|i| {
            let bit = self.bit_index(id, i);
            self.bits[bit / 64] & (1u64 << (bit % 64)) != 0
        })
    }

    /// How many more first-time ids this epoch can absorb.
    pub fn remaining_capacity(&self) -> usize {
        self.remaining
    }

    pub fn is_saturated(&self) -> bool {
        self.remaining == 0
    }

    /// The capacity this set was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn bit_index(&self, id: u64, hash_index: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        hash_index.hash(&mut hasher);
        (hasher.finish() as usize) % self.num_bits
    }
}

fn optimal_num_bits(n: usize, p: f64) -> usize {
    let ln2 = std::f64::consts::LN_2;
    let p = p.clamp(1e-9, 0.5);
    ((-(n as f64) * p.ln() / (ln2 * ln2)).ceil() as usize).max(64)
}

fn optimal_num_hashes(n: usize, m: usize) -> usize {
    let ln2 = std::f64::consts::LN_2;
    (((m as f64 / n as f64) * ln2).ceil() as usize).max(1)
}
