//! The chain-backed `EventSource`.

use async_trait::async_trait;
use std::sync::Arc;

use centive_core::{EventRecord, EventSource, IndexerError};

use crate::decode::LogDecoder;
use crate::fetcher::RpcClient;

const DEFAULT_MAX_LOG_RANGE: u64 = 1_000;

/// Reads the watched contract's logs over JSON-RPC and decodes them into
/// event records. Large ranges are split so the node never sees a
/// `eth_getLogs` span wider than `max_log_range`.
pub struct EvmEventSource {
    client: Arc<dyn RpcClient>,
    contract: String,
    decoder: LogDecoder,
    max_log_range: u64,
}

impl EvmEventSource {
    pub fn new(client: Arc<dyn RpcClient>, contract: impl Into<String>) -> Self {
        Self {
            client,
            contract: contract.into(),
            decoder: LogDecoder::new(),
            max_log_range: DEFAULT_MAX_LOG_RANGE,
        }
    }

    pub fn with_max_log_range(mut self, max_log_range: u64) -> Self {
        self.max_log_range = max_log_range.max(1);
        self
    }
}

#[async_trait]
impl EventSource for EvmEventSource {
    async fn chain_height(&self) -> Result<u64, IndexerError> {
        self.client.block_number().await
    }

    async fn events(&self, from: u64, to: u64) -> Result<Vec<EventRecord>, IndexerError> {
        if to < from {
            return Ok(vec![]);
        }

        let mut records = Vec::new();
        let mut start = from;
        while start <= to {
            let end = to.min(start + self.max_log_range - 1);
            let logs = self.client.logs(start, end, &self.contract).await?;
            for log in &logs {
                if log.is_removed() {
                    tracing::debug!(block = %log.block_number, "skipping removed log");
                    continue;
                }
                records.push(self.decoder.decode(log)?);
            }
            start = end + 1;
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::RawLog;
    use centive_core::EventPayload;
    use std::sync::Mutex;

    struct FakeClient {
        height: u64,
        logs: Vec<RawLog>,
        calls: Mutex<Vec<(u64, u64)>>,
    }

    impl FakeClient {
        fn new(height: u64, logs: Vec<RawLog>) -> Self {
            Self {
                height,
                logs,
                calls: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl RpcClient for FakeClient {
        async fn block_number(&self) -> Result<u64, IndexerError> {
            Ok(self.height)
        }

        async fn logs(
            &self,
            from: u64,
            to: u64,
            _address: &str,
        ) -> Result<Vec<RawLog>, IndexerError> {
            self.calls.lock().unwrap().push((from, to));
            Ok(self
                .logs
                .iter()
                .filter(|l| {
                    l.block_number()
                        .map(|b| b >= from && b <= to)
                        .unwrap_or(false)
                })
                .cloned()
                .collect())
        }
    }

    fn unknown_log(block: u64, index: u32, removed: bool) -> RawLog {
        RawLog {
            address: "0xc0ffee".into(),
            topics: vec!["0x".to_string() + &"ab".repeat(32)],
            data: "0x".into(),
            block_number: format!("0x{block:x}"),
            tx_hash: "0x0".into(),
            log_index: format!("0x{index:x}"),
            removed: Some(removed),
        }
    }

    #[tokio::test]
    async fn chunked_fetch_covers_whole_range() {
        let client = Arc::new(FakeClient::new(100, vec![unknown_log(3, 0, false)]));
        let source = EvmEventSource::new(client.clone(), "0xc0ffee").with_max_log_range(2);

        let events = source.events(1, 5).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            *client.calls.lock().unwrap(),
            vec![(1, 2), (3, 4), (5, 5)]
        );
    }

    #[tokio::test]
    async fn removed_logs_are_skipped() {
        let client = Arc::new(FakeClient::new(
            100,
            vec![unknown_log(3, 0, true), unknown_log(3, 1, false)],
        ));
        let source = EvmEventSource::new(client, "0xc0ffee");

        let events = source.events(1, 5).await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].payload,
            EventPayload::Unknown { .. }
        ));
        assert_eq!(events[0].log_index, 1);
    }

    #[tokio::test]
    async fn inverted_range_is_empty() {
        let client = Arc::new(FakeClient::new(100, vec![]));
        let source = EvmEventSource::new(client.clone(), "0xc0ffee");
        assert!(source.events(10, 5).await.unwrap().is_empty());
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn height_comes_from_the_node() {
        let client = Arc::new(FakeClient::new(2_222, vec![]));
        let source = EvmEventSource::new(client, "0xc0ffee");
        assert_eq!(source.chain_height().await.unwrap(), 2_222);
    }
}
