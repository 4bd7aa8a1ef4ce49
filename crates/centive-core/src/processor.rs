//! Block processor — applies one batch, block by block.
//!
//! Each event-bearing block walks `Idle → Locked → Applying` and ends
//! `Committed` or `Reverted`. Blocks with no events are never locked; they
//! ride along in the `skipped_blocks` counter until the next commit (or the
//! trailing advance) folds them into the watermark.

use std::sync::Arc;

use crate::error::IndexerError;
use crate::event::{sort_events, EventRecord};
use crate::gate::BlockRange;
use crate::projection::{apply_event, CampaignStore};
use crate::source::EventSource;
use crate::watermark::WatermarkStore;

/// Per-block processing state, for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Idle,
    Locked,
    Applying,
    Committed,
    Reverted,
}

impl std::fmt::Display for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Locked => write!(f, "locked"),
            Self::Applying => write!(f, "applying"),
            Self::Committed => write!(f, "committed"),
            Self::Reverted => write!(f, "reverted"),
        }
    }
}

/// Applies dispatched ranges against the projection store and advances the
/// watermark. The single writer of the watermark.
pub struct BlockProcessor {
    source: Arc<dyn EventSource>,
    watermark: Arc<dyn WatermarkStore>,
    campaigns: Arc<dyn CampaignStore>,
}

impl BlockProcessor {
    pub fn new(
        source: Arc<dyn EventSource>,
        watermark: Arc<dyn WatermarkStore>,
        campaigns: Arc<dyn CampaignStore>,
    ) -> Self {
        Self {
            source,
            watermark,
            campaigns,
        }
    }

    /// Process every block of `range` in order.
    ///
    /// On failure the watermark reflects the longest committed prefix; the
    /// rest of the range stays pending and is re-dispatched by a later scan
    /// tick.
    pub async fn process_range(&self, range: BlockRange) -> Result<(), IndexerError> {
        let mut events = self.source.events(range.from, range.to).await?;
        events.retain(|e| range.contains(e.block_number));
        sort_events(&mut events);

        tracing::info!(
            from = range.from,
            to = range.to,
            events = events.len(),
            "batch started"
        );

        let mut skipped: u64 = 0;
        let mut last_committed: Option<u64> = None;
        let mut cursor = 0usize;

        for block in range.from..=range.to {
            let start = cursor;
            while cursor < events.len() && events[cursor].block_number == block {
                cursor += 1;
            }
            let block_events = &events[start..cursor];

            if block_events.is_empty() {
                skipped += 1;
                continue;
            }

            self.process_block(block, skipped, block_events).await?;
            last_committed = Some(block);
            skipped = 0;
        }

        // Trailing empty blocks: advance once past them, otherwise the same
        // confirmed-but-empty range would be rescanned forever.
        if last_committed != Some(range.to) {
            if !self.watermark.set_last_processed(range.to).await? {
                return Err(IndexerError::WatermarkRejected { block: range.to });
            }
            tracing::info!(
                to = range.to,
                trailing_empty = skipped,
                "watermark advanced past trailing empty blocks"
            );
        }

        tracing::info!(from = range.from, to = range.to, "batch complete");
        Ok(())
    }

    async fn process_block(
        &self,
        block: u64,
        skipped: u64,
        events: &[EventRecord],
    ) -> Result<(), IndexerError> {
        if !self.watermark.begin_block(block, skipped).await? {
            return Err(IndexerError::LockUnavailable { block });
        }
        tracing::debug!(
            block,
            skipped,
            events = events.len(),
            state = %BlockState::Locked,
            "processing block"
        );

        match self.apply_block(block, events).await {
            Ok(()) => {
                if !self.watermark.finish_block(block).await? {
                    return Err(IndexerError::Storage(format!(
                        "processing lock for block {block} vanished before release"
                    )));
                }
                if !self.watermark.set_last_processed(block).await? {
                    return Err(IndexerError::WatermarkRejected { block });
                }
                tracing::info!(
                    block,
                    applied = events.len(),
                    state = %BlockState::Committed,
                    "block committed"
                );
                Ok(())
            }
            Err(e) => {
                if let Err(revert_err) = self.watermark.revert_block(block).await {
                    tracing::warn!(block, error = %revert_err, "lock release after revert failed");
                }
                tracing::warn!(block, error = %e, state = %BlockState::Reverted, "block reverted");
                Err(e.at_block(block))
            }
        }
    }

    /// Apply all of one block's events inside one projection transaction.
    async fn apply_block(&self, block: u64, events: &[EventRecord]) -> Result<(), IndexerError> {
        let mut tx = self.campaigns.begin(block).await?;
        for event in events {
            tracing::trace!(
                block,
                log_index = event.log_index,
                state = %BlockState::Applying,
                "applying event"
            );
            if let Err(e) = apply_event(tx.as_mut(), event).await {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(block, error = %rollback_err, "rollback failed");
                }
                return Err(e);
            }
        }
        tx.commit().await
    }
}
