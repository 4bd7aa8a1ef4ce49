//! centive-evm — chain access for the Centive indexer.
//!
//! Fetches the watched contract's logs over JSON-RPC, decodes them into the
//! core event union, and provides the tokio job runner that executes
//! dispatched batches.

pub mod decode;
pub mod fetcher;
pub mod runtime;
pub mod source;

pub use decode::LogDecoder;
pub use fetcher::{HttpRpcClient, RawLog, RpcClient};
pub use runtime::{run_scan_schedule, TokioJobRunner};
pub use source::EvmEventSource;
