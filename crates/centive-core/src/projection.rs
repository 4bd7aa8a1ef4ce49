//! Domain projection — campaign rows derived from ledger events.
//!
//! Projection writes happen only inside a per-block transaction owned by the
//! block processor. `apply_event` is the single dispatch point over the
//! event union; the match is exhaustive, so wiring a new kind (or leaving it
//! on the unhandled path) is a compile-time decision.

use async_trait::async_trait;

use crate::campaign::CampaignData;
use crate::error::IndexerError;
use crate::event::{EventPayload, EventRecord};

/// Store of campaign projections.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Open the all-or-nothing transaction for one block's writes.
    async fn begin(&self, block: u64) -> Result<Box<dyn CampaignTx>, IndexerError>;
}

/// One block's projection transaction. Dropped without `commit`, the writes
/// must not become visible.
#[async_trait]
pub trait CampaignTx: Send {
    async fn create_campaign(
        &mut self,
        user: &str,
        data: &CampaignData,
        trainer: &str,
    ) -> Result<(), IndexerError>;

    async fn commit(self: Box<Self>) -> Result<(), IndexerError>;

    async fn rollback(self: Box<Self>) -> Result<(), IndexerError>;
}

/// Apply one event inside the given block transaction.
///
/// `CreateCampaign` is the only wired kind. The remaining contract events
/// are recognized tags without a handler yet, and anything with an unknown
/// topic0 lands on the same error path — either way the block aborts
/// instead of the event being dropped.
pub async fn apply_event(
    tx: &mut dyn CampaignTx,
    event: &EventRecord,
) -> Result<(), IndexerError> {
    let unhandled = |kind: String| IndexerError::UnhandledEvent {
        kind,
        block: event.block_number,
        log_index: event.log_index,
    };

    match &event.payload {
        EventPayload::CreateCampaign {
            user,
            data,
            trainer,
        } => tx.create_campaign(user, data, trainer).await,
        EventPayload::Checkin { .. }
        | EventPayload::Sponsor { .. }
        | EventPayload::Donate { .. }
        | EventPayload::UpdateCharityPercentage { .. } => {
            Err(unhandled(event.payload.kind_name()))
        }
        EventPayload::Unknown { topic0 } => Err(unhandled(topic0.clone())),
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A committed campaign projection row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignRow {
    pub user: String,
    pub trainer: String,
    pub data: CampaignData,
    /// Block whose transaction created this row.
    pub block_number: u64,
}

type CampaignMap = HashMap<(String, u16), CampaignRow>;

/// In-memory campaign store for tests.
#[derive(Default)]
pub struct MemoryCampaignStore {
    campaigns: Arc<Mutex<CampaignMap>>,
}

impl MemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn campaign(&self, user: &str, nonce: u16) -> Option<CampaignRow> {
        self.campaigns
            .lock()
            .unwrap()
            .get(&(user.to_string(), nonce))
            .cloned()
    }

    pub fn campaign_count(&self) -> usize {
        self.campaigns.lock().unwrap().len()
    }

    /// All rows created by `block`, for write-attribution assertions.
    pub fn rows_for_block(&self, block: u64) -> Vec<CampaignRow> {
        self.campaigns
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.block_number == block)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn begin(&self, block: u64) -> Result<Box<dyn CampaignTx>, IndexerError> {
        Ok(Box::new(MemoryCampaignTx {
            campaigns: Arc::clone(&self.campaigns),
            block,
            pending: Vec::new(),
        }))
    }
}

/// Buffers writes; only `commit` publishes them to the shared map.
struct MemoryCampaignTx {
    campaigns: Arc<Mutex<CampaignMap>>,
    block: u64,
    pending: Vec<CampaignRow>,
}

#[async_trait]
impl CampaignTx for MemoryCampaignTx {
    async fn create_campaign(
        &mut self,
        user: &str,
        data: &CampaignData,
        trainer: &str,
    ) -> Result<(), IndexerError> {
        self.pending.push(CampaignRow {
            user: user.to_string(),
            trainer: trainer.to_string(),
            data: *data,
            block_number: self.block,
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), IndexerError> {
        let mut map = self.campaigns.lock().unwrap();
        for row in self.pending {
            map.insert((row.user.clone(), row.data.nonce), row);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), IndexerError> {
        Ok(())
    }
}
