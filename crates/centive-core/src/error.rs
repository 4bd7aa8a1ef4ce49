//! Error types for the indexing pipeline.

use thiserror::Error;

/// Errors that can occur while scanning, dispatching, or applying blocks.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("event decode failed: {0}")]
    Decode(String),

    /// The persisted cursor is ahead of what the chain now reports as final.
    /// Signals a misconfigured confirmation depth, a store restored from the
    /// wrong backup, or a reorg deeper than the confirmation depth.
    #[error("watermark {last_processed} is ahead of confirmed chain height {confirmed}")]
    CursorAhead { confirmed: u64, last_processed: u64 },

    #[error("could not acquire processing lock for block {block}")]
    LockUnavailable { block: u64 },

    #[error("watermark store rejected advance to block {block}")]
    WatermarkRejected { block: u64 },

    #[error("unhandled event kind '{kind}' at block {block} log {log_index}")]
    UnhandledEvent {
        kind: String,
        block: u64,
        log_index: u32,
    },

    /// A block's apply step failed and was reverted.
    #[error("block {block}: {source}")]
    Block {
        block: u64,
        #[source]
        source: Box<IndexerError>,
    },
}

impl IndexerError {
    /// Returns `true` for transient I/O failures (chain RPC or store
    /// unreachable) that the scan driver retries on its next tick.
    /// Everything else aborts the current run.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::Storage(_))
    }

    /// Attach the failing block's number (used when a block is reverted).
    pub fn at_block(self, block: u64) -> Self {
        Self::Block {
            block,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(IndexerError::Rpc("timeout".into()).is_transient());
        assert!(IndexerError::Storage("pool closed".into()).is_transient());
        assert!(!IndexerError::CursorAhead {
            confirmed: 90,
            last_processed: 100
        }
        .is_transient());
        assert!(!IndexerError::LockUnavailable { block: 5 }.is_transient());
    }

    #[test]
    fn at_block_wraps_source() {
        let err = IndexerError::UnhandledEvent {
            kind: "Checkin".into(),
            block: 42,
            log_index: 0,
        }
        .at_block(42);
        let msg = err.to_string();
        assert!(msg.starts_with("block 42:"), "{msg}");
        assert!(msg.contains("Checkin"), "{msg}");
    }
}
