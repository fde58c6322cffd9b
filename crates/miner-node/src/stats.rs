//! Mining statistics kept by the orchestrator.

use std::time::Duration;

use miner_core::SearchReport;

/// Counters accumulated over the lifetime of the miner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiningStats {
    /// Templates that passed dedup and started a search.
    pub templates_delivered: u64,
    /// Poll cycles that failed (transport, RPC or malformed template).
    pub failed_polls: u64,
    /// Total nonces evaluated.
    pub total_hashes: u64,
    /// Winning nonces for the active template.
    pub blocks_found: u64,
    /// Searches that ran out of nonces.
    pub searches_exhausted: u64,
    /// Results that arrived after their template was superseded.
    pub stale_results: u64,
}

impl MiningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished search into the totals.
    pub fn record_search(&mut self, report: &SearchReport) {
        self.total_hashes += report.hashes;
    }
}

/// Hashes per second over `elapsed`.
pub fn hash_rate(hashes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        hashes as f64 / secs
    } else {
        0.0
    }
}

/// Format a hash rate for display.
pub fn format_hash_rate(rate: f64) -> String {
    if rate >= 1_000_000_000.0 {
        format!("{:.2} GH/s", rate / 1_000_000_000.0)
    } else if rate >= 1_000_000.0 {
        format!("{:.2} MH/s", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.2} KH/s", rate / 1_000.0)
    } else {
        format!("{:.2} H/s", rate)
    }
}
