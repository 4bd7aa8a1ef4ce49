//! Confirmation gate — decides how much newly observed chain is final.

use crate::error::IndexerError;

/// An inclusive, contiguous block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    pub fn len(&self) -> u64 {
        self.to.saturating_sub(self.from) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }

    pub fn contains(&self, block: u64) -> bool {
        block >= self.from && block <= self.to
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Computes the confirmed-but-unprocessed range for one scan tick.
///
/// Blocks within `confirmation_depth` of the head are treated as not yet
/// final and never handed out.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationGate {
    confirmation_depth: u64,
}

impl ConfirmationGate {
    pub fn new(confirmation_depth: u64) -> Self {
        Self { confirmation_depth }
    }

    /// The pending confirmed range, if any.
    ///
    /// - `last_processed = None` means a batch is still in flight: no new
    ///   range is opened this tick.
    /// - A confirmed height below the cursor is a fatal invariant violation
    ///   (the store claims more progress than the chain reports final) and
    ///   is surfaced, never ignored.
    pub fn pending(
        &self,
        chain_height: u64,
        last_processed: Option<u64>,
    ) -> Result<Option<BlockRange>, IndexerError> {
        let Some(last) = last_processed else {
            return Ok(None);
        };

        let confirmed = chain_height.saturating_sub(self.confirmation_depth);
        if confirmed < last {
            return Err(IndexerError::CursorAhead {
                confirmed,
                last_processed: last,
            });
        }
        if confirmed == last {
            return Ok(None);
        }
        Ok(Some(BlockRange::new(last + 1, confirmed)))
    }
}
