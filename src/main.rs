//! cache-tier-sim binary: replay a trace through the configured policies
//! and print per-policy hit-rate statistics.

use clap::Parser;
use tracing::info;

use cache_tier_sim::cache::tiering::TieringCache;
use cache_tier_sim::config::{Cli, Config, PolicyKind};
use cache_tier_sim::policy::arc::ArcCache;
use cache_tier_sim::policy::lru::LruCache;
use cache_tier_sim::policy::ReplacementPolicy;
use cache_tier_sim::replay::replay_trace;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "cache_tier_sim=debug"
    } else {
        "cache_tier_sim=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("cache-tier-sim v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration; the CLI capacity wins over the file.
    let mut config = Config::load(&cli.config)?;
    if let Some(capacity) = cli.capacity {
        config.sim.capacity_bytes = capacity;
    }

    info!(
        trace = %cli.trace.display(),
        capacity_bytes = config.sim.capacity_bytes,
        block_bytes = config.sim.block_bytes,
        policies = ?config.sim.policies,
        "Configuration loaded"
    );

    // Build the configured policy set.
    let mut policies: Vec<Box<dyn ReplacementPolicy>> = config
        .sim
        .policies
        .iter()
        .map(|kind| -> Box<dyn ReplacementPolicy> {
            match kind {
                PolicyKind::Tiering => {
                    Box::new(TieringCache::new(config.sim.capacity_bytes, &config.tiering))
                }
                PolicyKind::Lru => Box::new(LruCache::new(config.sim.capacity_bytes)),
                PolicyKind::Arc => Box::new(ArcCache::new(config.capacity_objects())),
            }
        })
        .collect();

    // Replay and report.
    let report = replay_trace(
        &cli.trace,
        config.sim.block_bytes,
        config.sim.progress_every_lines,
        &mut policies,
    )?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    Ok(())
}
