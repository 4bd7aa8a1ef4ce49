//! Watermark store contract — the crash-safe resume point.
//!
//! The watermark is the height of the last fully applied block. The store
//! also holds the single in-flight block lock; while a lock exists,
//! `last_processed` reads as `None`, which is how the scan driver knows a
//! batch is still outstanding and must not open a new range.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;

/// Marker that a block is currently being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLock {
    pub block: u64,
    /// Immediately preceding blocks with zero relevant events, not yet
    /// reflected in the watermark.
    pub skipped_blocks: u64,
}

/// Persistence contract for the watermark and the per-block lock.
///
/// All operations are atomic from the indexer's point of view. The store —
/// not the job runner — is what makes batch processing single-flight: at
/// most one lock exists, and `begin_block` reports `false` instead of
/// creating a second one.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Last fully processed block, or `None` while a batch is in flight.
    async fn last_processed(&self) -> Result<Option<u64>, IndexerError>;

    /// Advance the watermark. Returns `false` if the store refused the
    /// advance (e.g. it would move the watermark backwards).
    async fn set_last_processed(&self, block: u64) -> Result<bool, IndexerError>;

    /// Acquire the processing lock for `block`. Returns `false` if a lock
    /// is already held.
    async fn begin_block(&self, block: u64, skipped_blocks: u64) -> Result<bool, IndexerError>;

    /// Release the lock after a clean apply. Returns `false` if no lock for
    /// `block` was held.
    async fn finish_block(&self, block: u64) -> Result<bool, IndexerError>;

    /// Release the lock after a failed apply. Best-effort.
    async fn revert_block(&self, block: u64) -> Result<(), IndexerError>;
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

use std::sync::Mutex;

/// In-memory watermark store for tests and ephemeral indexers.
///
/// Records every `begin_block` call so tests can assert on the
/// `skipped_blocks` accounting.
pub struct MemoryWatermarkStore {
    inner: Mutex<Inner>,
}

struct Inner {
    watermark: u64,
    lock: Option<BlockLock>,
    lock_history: Vec<BlockLock>,
}

impl MemoryWatermarkStore {
    pub fn new(watermark: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                watermark,
                lock: None,
                lock_history: Vec::new(),
            }),
        }
    }

    /// The raw watermark value, ignoring any in-flight lock.
    pub fn watermark(&self) -> u64 {
        self.inner.lock().unwrap().watermark
    }

    /// Every lock ever acquired, in acquisition order.
    pub fn lock_records(&self) -> Vec<BlockLock> {
        self.inner.lock().unwrap().lock_history.clone()
    }

    /// The currently held lock, if any.
    pub fn held_lock(&self) -> Option<BlockLock> {
        self.inner.lock().unwrap().lock
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn last_processed(&self) -> Result<Option<u64>, IndexerError> {
        let inner = self.inner.lock().unwrap();
        if inner.lock.is_some() {
            return Ok(None);
        }
        Ok(Some(inner.watermark))
    }

    async fn set_last_processed(&self, block: u64) -> Result<bool, IndexerError> {
        let mut inner = self.inner.lock().unwrap();
        if block < inner.watermark {
            return Ok(false);
        }
        inner.watermark = block;
        Ok(true)
    }

    async fn begin_block(&self, block: u64, skipped_blocks: u64) -> Result<bool, IndexerError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.lock.is_some() {
            return Ok(false);
        }
        let lock = BlockLock {
            block,
            skipped_blocks,
        };
        inner.lock = Some(lock);
        inner.lock_history.push(lock);
        Ok(true)
    }

    async fn finish_block(&self, block: u64) -> Result<bool, IndexerError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.lock {
            Some(lock) if lock.block == block => {
                inner.lock = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revert_block(&self, block: u64) -> Result<(), IndexerError> {
        let mut inner = self.inner.lock().unwrap();
        if matches!(inner.lock, Some(lock) if lock.block == block) {
            inner.lock = None;
        }
        Ok(())
    }
}
