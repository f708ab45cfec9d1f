//! Runtime configuration for cache-tier-sim.
//!
//! Configuration can be loaded from a JSON file or constructed
//! programmatically. All engine knobs (capacity, epoch sizing, eviction
//! tuning) live here.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "cache-tier-sim", about = "Block-cache eviction simulator")]
pub struct Cli {
    /// Path to the access trace file.
    pub trace: PathBuf,

    /// Cache capacity in bytes (overrides the config file).
    #[arg(short, long)]
    pub capacity: Option<u64>,

    /// Path to configuration file (JSON).
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Emit the final report as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Which policies a replay run evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Temperature-based tiering eviction engine.
    Tiering,
    /// Size-aware least-recently-used.
    Lru,
    /// Adaptive replacement with ghost lists.
    Arc,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Replay harness settings.
    pub sim: SimConfig,

    /// Tiering engine tuning.
    pub tiering: TieringConfig,
}

/// Replay harness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Cache capacity in bytes shared by all byte-capacitated policies.
    pub capacity_bytes: u64,

    /// Size of one trace block in bytes.
    pub block_bytes: u64,

    /// Log replay progress every N trace lines (0 = never).
    pub progress_every_lines: u64,

    /// Policies to evaluate, in report order.
    pub policies: Vec<PolicyKind>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 64 * 1024 * 1024, // 64 MiB
            block_bytes: 4096,
            progress_every_lines: 100_000,
            policies: vec![PolicyKind::Tiering, PolicyKind::Lru, PolicyKind::Arc],
        }
    }
}

/// Tiering engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieringConfig {
    /// Objects younger than this are never evicted.
    pub min_evict_age_secs: f64,

    /// Historical epochs retained (and grade table length).
    pub hit_set_count: usize,

    /// Per-epoch grade decay, as a fraction in (0, 1).
    pub hit_set_grade_decay_rate: f64,

    /// Distinct ids one epoch's hit set absorbs before rotation.
    pub hit_set_capacity: usize,

    /// Bloom false positive rate for each hit set.
    pub hit_set_fpp: f64,

    /// How many matching historical epochs contribute to a temperature.
    pub hit_set_search_last_n: usize,

    /// Eviction conservativeness in millionths (0..=1_000_000): higher
    /// protects a wider hot tail.
    pub evict_effort: u64,

    /// Fraction of the cache scanned per eviction trigger.
    pub evict_check_fraction: f64,

    /// Maximum eviction passes per over-capacity miss; passes stop early
    /// once under capacity. 1 performs a single pass and tolerates the
    /// resulting overshoot.
    pub evict_max_passes: usize,
}

impl Default for TieringConfig {
    fn default() -> Self {
        Self {
            min_evict_age_secs: 0.8,
            hit_set_count: 3,
            hit_set_grade_decay_rate: 0.4,
            hit_set_capacity: 10_000,
            hit_set_fpp: 0.01,
            hit_set_search_last_n: 3,
            evict_effort: 5_000,
            evict_check_fraction: 0.005,
            evict_max_passes: 1,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Object-count capacity for count-capacitated policies, derived from
    /// the byte budget.
    pub fn capacity_objects(&self) -> usize {
        if self.sim.block_bytes == 0 {
            return 0;
        }
        (self.sim.capacity_bytes / self.sim.block_bytes) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.tiering.hit_set_count, 3);
        assert_eq!(cfg.tiering.evict_effort, 5_000);
        assert_eq!(cfg.sim.block_bytes, 4096);
        assert_eq!(cfg.sim.policies.len(), 3);
    }

    #[test]
    fn test_capacity_objects() {
        let mut cfg = Config::default();
        cfg.sim.capacity_bytes = 40_960;
        assert_eq!(cfg.capacity_objects(), 10);
        cfg.sim.block_bytes = 0;
        assert_eq!(cfg.capacity_objects(), 0);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tiering.hit_set_capacity, cfg.tiering.hit_set_capacity);
        assert_eq!(back.sim.policies, cfg.sim.policies);
    }
}
