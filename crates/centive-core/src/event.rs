//! Ledger events — the closed set of log types the contract emits.
//!
//! Adding a kind here forces a decision in `projection::apply_event`; there
//! is no catch-all arm for known kinds.

use crate::campaign::CampaignData;

/// The log types the contract emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CreateCampaign,
    Checkin,
    Sponsor,
    Donate,
    UpdateCharityPercentage,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateCampaign => "CreateCampaign",
            Self::Checkin => "Checkin",
            Self::Sponsor => "Sponsor",
            Self::Donate => "Donate",
            Self::UpdateCharityPercentage => "UpdateCharityPercentage",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded payload of one log entry.
///
/// `Unknown` carries logs whose topic0 matched none of the known signatures;
/// applying one raises the unhandled-event error rather than dropping it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    CreateCampaign {
        user: String,
        data: CampaignData,
        trainer: String,
    },
    Checkin {
        user: String,
        nonce: u16,
    },
    Sponsor {
        user: String,
        nonce: u16,
    },
    Donate {
        data: CampaignData,
    },
    UpdateCharityPercentage {
        nonce: u16,
        charity_percentage: u8,
    },
    Unknown {
        topic0: String,
    },
}

impl EventPayload {
    /// The recognized kind, or `None` for an unknown topic0.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::CreateCampaign { .. } => Some(EventKind::CreateCampaign),
            Self::Checkin { .. } => Some(EventKind::Checkin),
            Self::Sponsor { .. } => Some(EventKind::Sponsor),
            Self::Donate { .. } => Some(EventKind::Donate),
            Self::UpdateCharityPercentage { .. } => Some(EventKind::UpdateCharityPercentage),
            Self::Unknown { .. } => None,
        }
    }

    /// Name used in errors and logs; the raw topic0 for unknown payloads.
    pub fn kind_name(&self) -> String {
        match self {
            Self::Unknown { topic0 } => topic0.clone(),
            other => other
                .kind()
                .map(|k| k.name().to_string())
                .unwrap_or_default(),
        }
    }
}

/// One log entry, positioned in the ledger's total order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub block_number: u64,
    /// Position within the block; defines apply order for one block.
    pub log_index: u32,
    pub payload: EventPayload,
}

impl EventRecord {
    pub fn new(block_number: u64, log_index: u32, payload: EventPayload) -> Self {
        Self {
            block_number,
            log_index,
            payload,
        }
    }

    pub fn sort_key(&self) -> (u64, u32) {
        (self.block_number, self.log_index)
    }
}

/// Re-sort into ledger order. The event source may return any order.
pub fn sort_events(events: &mut [EventRecord]) {
    events.sort_unstable_by_key(EventRecord::sort_key);
}
