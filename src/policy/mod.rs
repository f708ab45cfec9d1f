//! Replacement policies evaluated side-by-side by the replay harness.
//!
//! Every policy exposes the same surface: `get(id, size)` reporting hit or
//! miss, plus a statistics snapshot. The harness holds policies as trait
//! objects and feeds each access to all of them.

use std::fmt;

use serde::Serialize;

pub mod arc;
pub mod lru;

/// Common interface for all simulated cache policies.
pub trait ReplacementPolicy {
    /// Short policy label used in reports.
    fn name(&self) -> &'static str;

    /// Simulate one access. Returns true on a cache hit.
    fn get(&mut self, id: u64, size: u64) -> bool;

    /// Snapshot of the policy's counters.
    fn stats(&self) -> CacheStats;
}

/// Hit-rate counters for one policy.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub policy: String,
    pub capacity: u64,
    pub requests: u64,
    pub hits: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.hits as f64 / self.requests as f64
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: cache_size:{} request:{} hit:{} hit_rate:{:.4}",
            self.policy,
            self.capacity,
            self.requests,
            self.hits,
            self.hit_rate()
        )
    }
}
