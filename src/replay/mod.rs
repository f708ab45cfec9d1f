//! Trace replay harness.
//!
//! Streams a trace file once and feeds every block access to every enabled
//! policy, so all policies see the identical access sequence. Progress is
//! logged periodically; the final report carries one statistics snapshot
//! per policy.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::policy::{CacheStats, ReplacementPolicy};
use crate::trace::TraceReader;

/// Outcome of one replay run.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Trace file label.
    pub trace: String,
    /// Trace lines processed.
    pub lines: u64,
    /// Block accesses issued to each policy.
    pub accesses: u64,
    /// Wall-clock seconds spent replaying.
    pub elapsed_secs: f64,
    /// Per-policy counters, in the order the policies were supplied.
    pub policies: Vec<CacheStats>,
}

impl ReplayReport {
    /// Plain-text summary, one line per policy.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for stats in &self.policies {
            out.push_str(&format!("trace:{} {stats}\n", self.trace));
        }
        out
    }
}

/// Replay `trace_path` through all `policies`.
///
/// Each trace line fans out into one `get` per touched block, sized at
/// `block_bytes`. Every `progress_every_lines` lines an info event reports
/// throughput; pass 0 to disable.
pub fn replay_trace(
    trace_path: &Path,
    block_bytes: u64,
    progress_every_lines: u64,
    policies: &mut [Box<dyn ReplacementPolicy>],
) -> anyhow::Result<ReplayReport> {
    let reader = TraceReader::open(trace_path)
        .with_context(|| format!("opening trace {}", trace_path.display()))?;
    let trace_label = trace_path.display().to_string();
    let start = Instant::now();

    let mut lines = 0u64;
    let mut accesses = 0u64;
    for record in reader {
        let record = record.context("reading trace")?;
        lines += 1;
        for block in record.blocks() {
            accesses += 1;
            for policy in policies.iter_mut() {
                policy.get(block, block_bytes);
            }
        }

        if progress_every_lines > 0 && lines % progress_every_lines == 0 {
            info!(
                lines,
                accesses,
                elapsed_secs = start.elapsed().as_secs(),
                "Replay progress"
            );
        }
    }

    let elapsed = start.elapsed();
    info!(
        trace = %trace_label,
        lines,
        accesses,
        elapsed_secs = elapsed.as_secs_f64(),
        "Replay complete"
    );

    Ok(ReplayReport {
        trace: trace_label,
        lines,
        accesses,
        elapsed_secs: elapsed.as_secs_f64(),
        policies: policies.iter().map(|p| p.stats()).collect(),
    })
}
