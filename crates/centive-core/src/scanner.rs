//! Scan driver — the periodic loop that finds confirmed work.
//!
//! One invocation runs a fixed number of ticks, sleeping one block interval
//! between them; the external scheduler re-invokes the driver every scan
//! interval, so the loop amortizes scheduler overhead without becoming a
//! daemon. Transient source/store errors abort the tick only; a gate
//! invariant violation fails the whole run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::IndexerConfig;
use crate::dispatch::{BatchDispatcher, JobRunner};
use crate::error::IndexerError;
use crate::gate::{BlockRange, ConfirmationGate};
use crate::source::EventSource;
use crate::watermark::WatermarkStore;

/// Sleep abstraction so the driver is testable without real delays.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation over the tokio timer.
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// The periodic scan loop.
pub struct ScanDriver {
    gate: ConfirmationGate,
    dispatcher: BatchDispatcher,
    ticks_per_run: u32,
    tick_interval: Duration,
    source: Arc<dyn EventSource>,
    watermark: Arc<dyn WatermarkStore>,
    runner: Arc<dyn JobRunner>,
    clock: Arc<dyn Clock>,
}

impl ScanDriver {
    pub fn new(
        config: &IndexerConfig,
        source: Arc<dyn EventSource>,
        watermark: Arc<dyn WatermarkStore>,
        runner: Arc<dyn JobRunner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gate: ConfirmationGate::new(config.confirmation_depth),
            dispatcher: BatchDispatcher::new(config.max_batch_size),
            ticks_per_run: config.ticks_per_run,
            tick_interval: config.block_time(),
            source,
            watermark,
            runner,
            clock,
        }
    }

    /// Run one bounded scan: `ticks_per_run` polls, one block interval apart.
    pub async fn run(&self) -> Result<(), IndexerError> {
        for tick in 0..self.ticks_per_run {
            if tick > 0 {
                self.clock.sleep(self.tick_interval).await;
            }
            match self.tick().await {
                Ok(Some(batch)) => {
                    tracing::info!(tick, from = batch.from, to = batch.to, "batch dispatched");
                }
                Ok(None) => {
                    tracing::debug!(tick, "no confirmed work");
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(tick, error = %e, "tick failed; retrying next tick");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// One poll: height → watermark → gate → dispatch.
    async fn tick(&self) -> Result<Option<BlockRange>, IndexerError> {
        let chain_height = self.source.chain_height().await?;
        let last_processed = self.watermark.last_processed().await?;

        let Some(pending) = self.gate.pending(chain_height, last_processed)? else {
            return Ok(None);
        };

        let batch = self.dispatcher.dispatch(pending, self.runner.as_ref())?;
        Ok(Some(batch))
    }
}
