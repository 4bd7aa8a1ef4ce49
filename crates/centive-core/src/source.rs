//! Event source contract — how the indexer reads the ledger.

use async_trait::async_trait;

use crate::error::IndexerError;
use crate::event::EventRecord;

/// Read side of the ledger.
///
/// Implementations fetch logs from a chain node (`centive-evm`) or serve
/// canned events in tests. Events may come back in any order; the block
/// processor re-sorts by `(block_number, log_index)`.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Current chain head height.
    async fn chain_height(&self) -> Result<u64, IndexerError>;

    /// All events of interest in `[from, to]` (inclusive).
    async fn events(&self, from: u64, to: u64) -> Result<Vec<EventRecord>, IndexerError>;
}

// ─── In-memory source (for testing) ──────────────────────────────────────────

use std::sync::Mutex;

/// Scripted event source for tests.
#[derive(Default)]
pub struct MemoryEventSource {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    height: u64,
    events: Vec<EventRecord>,
    fail_next: bool,
}

impl MemoryEventSource {
    pub fn new(height: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                height,
                ..Inner::default()
            }),
        }
    }

    pub fn set_height(&self, height: u64) {
        self.inner.lock().unwrap().height = height;
    }

    pub fn push(&self, event: EventRecord) {
        self.inner.lock().unwrap().events.push(event);
    }

    /// Make the next call (height or events) fail with an RPC error.
    pub fn fail_next(&self) {
        self.inner.lock().unwrap().fail_next = true;
    }

    fn take_failure(inner: &mut Inner) -> Result<(), IndexerError> {
        if inner.fail_next {
            inner.fail_next = false;
            return Err(IndexerError::Rpc("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn chain_height(&self) -> Result<u64, IndexerError> {
        let mut inner = self.inner.lock().unwrap();
        Self::take_failure(&mut inner)?;
        Ok(inner.height)
    }

    async fn events(&self, from: u64, to: u64) -> Result<Vec<EventRecord>, IndexerError> {
        let mut inner = self.inner.lock().unwrap();
        Self::take_failure(&mut inner)?;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.block_number >= from && e.block_number <= to)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;

    #[tokio::test]
    async fn range_query_is_inclusive() {
        let source = MemoryEventSource::new(120);
        for block in [99, 100, 105, 106] {
            source.push(EventRecord::new(
                block,
                0,
                EventPayload::Unknown {
                    topic0: "0x0".into(),
                },
            ));
        }
        let events = source.events(100, 105).await.unwrap();
        let blocks: Vec<_> = events.iter().map(|e| e.block_number).collect();
        assert_eq!(blocks, vec![100, 105]);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let source = MemoryEventSource::new(10);
        source.fail_next();
        assert!(source.chain_height().await.is_err());
        assert_eq!(source.chain_height().await.unwrap(), 10);
    }
}
