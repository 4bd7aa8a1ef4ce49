//! Tokio-backed job execution.
//!
//! Batch jobs run as detached tasks; a failed job logs its error as the
//! failure record and the range stays pending, so the next scan re-dispatches
//! it from the last good watermark. Single-flight comes from the watermark
//! store's lock convention, not from anything here.

use std::sync::Arc;
use std::time::Duration;

use centive_core::{BatchJob, BlockProcessor, IndexerError, JobRunner, ScanDriver};

/// Spawns each batch job on the tokio runtime.
pub struct TokioJobRunner {
    processor: Arc<BlockProcessor>,
}

impl TokioJobRunner {
    pub fn new(processor: Arc<BlockProcessor>) -> Self {
        Self { processor }
    }
}

impl JobRunner for TokioJobRunner {
    fn enqueue(&self, job: BatchJob) -> Result<(), IndexerError> {
        let processor = Arc::clone(&self.processor);
        tokio::spawn(async move {
            if let Err(e) = processor.process_range(job.range).await {
                tracing::error!(
                    from = job.range.from,
                    to = job.range.to,
                    error = %e,
                    "batch job failed"
                );
            }
        });
        Ok(())
    }
}

/// Re-invoke the scan driver every `interval`, forever.
///
/// A failed run (gate invariant violation) is logged and the schedule keeps
/// firing — the recurring job is the operational surface where those
/// failures show up.
pub async fn run_scan_schedule(driver: Arc<ScanDriver>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = driver.run().await {
            tracing::error!(error = %e, "scan run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use centive_core::campaign::CampaignData;
    use centive_core::projection::MemoryCampaignStore;
    use centive_core::source::MemoryEventSource;
    use centive_core::watermark::MemoryWatermarkStore;
    use centive_core::{BlockRange, CampaignStore, EventPayload, EventRecord, EventSource, WatermarkStore};

    #[tokio::test]
    async fn enqueued_job_processes_its_range() {
        let source = Arc::new(MemoryEventSource::new(20));
        source.push(EventRecord::new(
            10,
            0,
            EventPayload::CreateCampaign {
                user: "0x1111111111111111111111111111111111111111".into(),
                data: CampaignData {
                    nonce: 1,
                    ..CampaignData::default()
                },
                trainer: "0x2222222222222222222222222222222222222222".into(),
            },
        ));
        let store = Arc::new(MemoryWatermarkStore::new(9));
        let campaigns = Arc::new(MemoryCampaignStore::new());
        let processor = Arc::new(BlockProcessor::new(
            source.clone() as Arc<dyn EventSource>,
            store.clone() as Arc<dyn WatermarkStore>,
            campaigns.clone() as Arc<dyn CampaignStore>,
        ));

        let runner = TokioJobRunner::new(processor);
        runner
            .enqueue(BatchJob {
                range: BlockRange::new(10, 10),
            })
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while store.watermark() < 10 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("job did not complete");

        assert_eq!(campaigns.campaign_count(), 1);
    }
}
