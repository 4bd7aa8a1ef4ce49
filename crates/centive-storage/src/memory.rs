//! In-memory index store.
//!
//! Bundles the watermark store and the campaign projection behind one value
//! so tests and short-lived indexers can wire a whole pipeline without a
//! database. All data is lost when the process exits.

use async_trait::async_trait;

use centive_core::projection::MemoryCampaignStore;
use centive_core::watermark::MemoryWatermarkStore;
use centive_core::{
    BlockLock, CampaignRow, CampaignStore, CampaignTx, IndexerError, WatermarkStore,
};

/// In-memory watermark + campaign storage.
pub struct MemoryIndexStore {
    watermark: MemoryWatermarkStore,
    campaigns: MemoryCampaignStore,
}

impl MemoryIndexStore {
    /// Create a store with the watermark seeded at `start_block`.
    pub fn new(start_block: u64) -> Self {
        Self {
            watermark: MemoryWatermarkStore::new(start_block),
            campaigns: MemoryCampaignStore::new(),
        }
    }

    pub fn campaign(&self, user: &str, nonce: u16) -> Option<CampaignRow> {
        self.campaigns.campaign(user, nonce)
    }

    pub fn campaign_count(&self) -> usize {
        self.campaigns.campaign_count()
    }

    /// The raw watermark value, ignoring any in-flight lock.
    pub fn watermark(&self) -> u64 {
        self.watermark.watermark()
    }

    /// Every lock ever acquired, in acquisition order.
    pub fn lock_records(&self) -> Vec<BlockLock> {
        self.watermark.lock_records()
    }
}

#[async_trait]
impl WatermarkStore for MemoryIndexStore {
    async fn last_processed(&self) -> Result<Option<u64>, IndexerError> {
        self.watermark.last_processed().await
    }

    async fn set_last_processed(&self, block: u64) -> Result<bool, IndexerError> {
        self.watermark.set_last_processed(block).await
    }

    async fn begin_block(&self, block: u64, skipped_blocks: u64) -> Result<bool, IndexerError> {
        self.watermark.begin_block(block, skipped_blocks).await
    }

    async fn finish_block(&self, block: u64) -> Result<bool, IndexerError> {
        self.watermark.finish_block(block).await
    }

    async fn revert_block(&self, block: u64) -> Result<(), IndexerError> {
        self.watermark.revert_block(block).await
    }
}

#[async_trait]
impl CampaignStore for MemoryIndexStore {
    async fn begin(&self, block: u64) -> Result<Box<dyn CampaignTx>, IndexerError> {
        self.campaigns.begin(block).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use centive_core::CampaignData;

    const USER: &str = "0x1111111111111111111111111111111111111111";

    #[tokio::test]
    async fn one_store_serves_both_contracts() {
        let store = MemoryIndexStore::new(100);

        assert!(store.begin_block(104, 4).await.unwrap());
        let mut tx = store.begin(104).await.unwrap();
        tx.create_campaign(
            USER,
            &CampaignData {
                nonce: 1,
                ..CampaignData::default()
            },
            "0x2222222222222222222222222222222222222222",
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        assert!(store.finish_block(104).await.unwrap());
        assert!(store.set_last_processed(104).await.unwrap());

        assert_eq!(store.watermark(), 104);
        assert_eq!(store.campaign(USER, 1).unwrap().block_number, 104);
        assert_eq!(
            store.lock_records(),
            vec![BlockLock {
                block: 104,
                skipped_blocks: 4
            }]
        );
    }
}
