//! Indexer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Policy knobs for the scan driver, gate, and dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Block the watermark is seeded at on first start (typically the
    /// contract's deployment block).
    #[serde(default)]
    pub start_block: u64,
    /// Number of most-recent blocks treated as not yet final.
    #[serde(default = "default_confirmation_depth")]
    pub confirmation_depth: u64,
    /// Upper bound on the number of blocks per dispatched batch.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u64,
    /// How often the recurring scheduler re-invokes the scan driver.
    #[serde(default = "default_scan_interval_minutes")]
    pub scan_interval_minutes: u64,
    /// Expected inter-block spacing; sizes the driver's per-tick sleep.
    #[serde(default = "default_block_time_ms")]
    pub block_time_ms: u64,
    /// Polls per scan-driver invocation.
    #[serde(default = "default_ticks_per_run")]
    pub ticks_per_run: u32,
}

fn default_confirmation_depth() -> u64 {
    6
}
fn default_max_batch_size() -> u64 {
    50
}
fn default_scan_interval_minutes() -> u64 {
    2
}
fn default_block_time_ms() -> u64 {
    15_000
}
fn default_ticks_per_run() -> u32 {
    4
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            start_block: 0,
            confirmation_depth: default_confirmation_depth(),
            max_batch_size: default_max_batch_size(),
            scan_interval_minutes: default_scan_interval_minutes(),
            block_time_ms: default_block_time_ms(),
            ticks_per_run: default_ticks_per_run(),
        }
    }
}

impl IndexerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_minutes * 60)
    }

    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }
}
