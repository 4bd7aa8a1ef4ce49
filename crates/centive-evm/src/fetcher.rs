//! JSON-RPC access to the chain node.
//!
//! The client is deliberately retry-free: a failed call surfaces as a
//! transient `Rpc` error and the scan driver or job runner's schedule is
//! what retries, never this layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use centive_core::IndexerError;

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(rename = "removed")]
    pub removed: Option<bool>,
}

impl RawLog {
    pub fn block_number(&self) -> Result<u64, IndexerError> {
        parse_hex_u64(&self.block_number)
    }

    pub fn log_index(&self) -> Result<u32, IndexerError> {
        Ok(parse_hex_u64(&self.log_index)? as u32)
    }

    /// `true` if the node flagged this log as dropped by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }
}

/// Parse a hex-encoded quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Result<u64, IndexerError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(stripped, 16)
        .map_err(|e| IndexerError::Decode(format!("bad hex quantity '{s}': {e}")))
}

/// Chain node access used by the event source.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Current head block number.
    async fn block_number(&self) -> Result<u64, IndexerError>;

    /// All logs emitted by `address` in `[from, to]`.
    async fn logs(&self, from: u64, to: u64, address: &str) -> Result<Vec<RawLog>, IndexerError>;
}

// ─── HTTP implementation ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// `reqwest`-backed JSON-RPC 2.0 client.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self, IndexerError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| IndexerError::Rpc(format!("building HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, IndexerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexerError::Rpc(format!("{method}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(IndexerError::Rpc(format!("{method}: HTTP {status}")));
        }

        let parsed: RpcResponse = resp
            .json()
            .await
            .map_err(|e| IndexerError::Rpc(format!("{method}: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(IndexerError::Rpc(format!(
                "{method}: node error {}: {}",
                err.code, err.message
            )));
        }
        parsed
            .result
            .ok_or_else(|| IndexerError::Rpc(format!("{method}: empty result")))
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn block_number(&self) -> Result<u64, IndexerError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| IndexerError::Rpc("eth_blockNumber: non-string result".into()))?;
        parse_hex_u64(hex)
    }

    async fn logs(&self, from: u64, to: u64, address: &str) -> Result<Vec<RawLog>, IndexerError> {
        let filter = json!([{
            "fromBlock": format!("0x{from:x}"),
            "toBlock": format!("0x{to:x}"),
            "address": address,
        }]);
        let result = self.call("eth_getLogs", filter).await?;
        serde_json::from_value(result)
            .map_err(|e| IndexerError::Rpc(format!("eth_getLogs: bad log shape: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_quantities() {
        assert_eq!(parse_hex_u64("0x1").unwrap(), 1);
        assert_eq!(parse_hex_u64("0xff").unwrap(), 255);
        assert_eq!(parse_hex_u64("1234").unwrap(), 0x1234);
        assert!(parse_hex_u64("0xzz").is_err());
        assert!(parse_hex_u64("").is_err());
    }

    #[test]
    fn raw_log_accessors() {
        let log = RawLog {
            address: "0x0".into(),
            topics: vec![],
            data: "0x".into(),
            block_number: "0x12a05f200".into(),
            tx_hash: "0x0".into(),
            log_index: "0x5".into(),
            removed: None,
        };
        assert_eq!(log.block_number().unwrap(), 5_000_000_000);
        assert_eq!(log.log_index().unwrap(), 5);
        assert!(!log.is_removed());
    }

    #[test]
    fn raw_log_deserializes_node_shape() {
        let json = r#"{
            "address": "0xabc",
            "topics": ["0xddf2"],
            "data": "0x00",
            "blockNumber": "0x10",
            "transactionHash": "0xbeef",
            "logIndex": "0x0",
            "removed": true
        }"#;
        let log: RawLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.block_number().unwrap(), 16);
        assert!(log.is_removed());
    }
}
