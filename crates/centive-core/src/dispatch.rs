//! Batch dispatch — bounded units of asynchronous work.

use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::gate::BlockRange;

/// Descriptor of one batch job: apply every event in `range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub range: BlockRange,
}

/// Hands work to the external asynchronous job executor.
///
/// `enqueue` must not block; the job runs on the runner's own workers.
/// Single-flight is the watermark store's concern (`last_processed` is
/// `None` while a batch is outstanding), not the runner's.
pub trait JobRunner: Send + Sync {
    fn enqueue(&self, job: BatchJob) -> Result<(), IndexerError>;
}

/// Clips a pending range to the batch-size policy and enqueues exactly one
/// job for it.
#[derive(Debug, Clone, Copy)]
pub struct BatchDispatcher {
    max_batch_size: u64,
}

impl BatchDispatcher {
    pub fn new(max_batch_size: u64) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
        }
    }

    /// Dispatch the head of `pending`, at most `max_batch_size` blocks.
    /// Returns the range actually dispatched.
    pub fn dispatch(
        &self,
        pending: BlockRange,
        runner: &dyn JobRunner,
    ) -> Result<BlockRange, IndexerError> {
        let to = pending.to.min(pending.from + self.max_batch_size - 1);
        let batch = BlockRange::new(pending.from, to);
        runner.enqueue(BatchJob { range: batch })?;
        tracing::debug!(from = batch.from, to = batch.to, "batch enqueued");
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records enqueued jobs.
    #[derive(Default)]
    struct RecordingRunner {
        jobs: Mutex<Vec<BatchJob>>,
    }

    impl JobRunner for RecordingRunner {
        fn enqueue(&self, job: BatchJob) -> Result<(), IndexerError> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }

    #[test]
    fn clips_to_max_batch_size() {
        let runner = RecordingRunner::default();
        let dispatcher = BatchDispatcher::new(10);

        let batch = dispatcher
            .dispatch(BlockRange::new(101, 500), &runner)
            .unwrap();

        assert_eq!(batch, BlockRange::new(101, 110));
        assert_eq!(batch.len(), 10);
        assert_eq!(runner.jobs.lock().unwrap().len(), 1);
    }

    #[test]
    fn short_range_dispatched_whole() {
        let runner = RecordingRunner::default();
        let dispatcher = BatchDispatcher::new(10);

        let batch = dispatcher
            .dispatch(BlockRange::new(101, 103), &runner)
            .unwrap();

        assert_eq!(batch, BlockRange::new(101, 103));
    }

    #[test]
    fn single_block_range() {
        let runner = RecordingRunner::default();
        let dispatcher = BatchDispatcher::new(1);

        let batch = dispatcher
            .dispatch(BlockRange::new(7, 9), &runner)
            .unwrap();

        assert_eq!(batch, BlockRange::new(7, 7));
    }
}
