//! centive-core — chain event indexer for the campaign contract.
//!
//! # Architecture
//!
//! ```text
//! ScanDriver (periodic, bounded ticks)
//!     ├── ConfirmationGate   (how much of the chain is final)
//!     ├── BatchDispatcher    (bounded ranges → JobRunner)
//!     └── (async) BlockProcessor
//!             ├── EventSource    (ledger reads)
//!             ├── CampaignStore  (per-block projection transactions)
//!             └── WatermarkStore (resume point + single in-flight lock)
//! ```
//!
//! The watermark only ever reflects blocks whose events all committed, in
//! ledger order, so a crash or failed batch resumes exactly where the last
//! good block left off.

pub mod campaign;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod gate;
pub mod processor;
pub mod projection;
pub mod scanner;
pub mod source;
pub mod watermark;

pub use campaign::CampaignData;
pub use config::IndexerConfig;
pub use dispatch::{BatchDispatcher, BatchJob, JobRunner};
pub use error::IndexerError;
pub use event::{EventKind, EventPayload, EventRecord};
pub use gate::{BlockRange, ConfirmationGate};
pub use processor::{BlockProcessor, BlockState};
pub use projection::{CampaignRow, CampaignStore, CampaignTx};
pub use scanner::{Clock, ScanDriver, TokioClock};
pub use source::EventSource;
pub use watermark::{BlockLock, WatermarkStore};
