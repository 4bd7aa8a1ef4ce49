//! The packed campaign record.
//!
//! The contract stores a whole campaign in a single 32-byte slot and emits it
//! verbatim in `CreateCampaign`/`Donate` logs. Fields are big-endian,
//! fixed-width, at fixed byte offsets; the last five bytes are padding.

use serde::{Deserialize, Serialize};

use crate::error::IndexerError;

/// A campaign record unpacked from its 32-byte slot.
///
/// Byte layout (offset..end):
/// nonce 0..2, length 2..3, frequency 3..4, cooldown 4..5, stake 5..9,
/// completed 9..11, started 11..15, bonus 15..19, missed 19..21,
/// last_completed 21..25, charity_percentage 25..26, trainer_percentage 26..27.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignData {
    pub nonce: u16,
    pub length: u8,
    pub frequency: u8,
    pub cooldown: u8,
    pub stake: u32,
    pub completed: u16,
    pub started: u32,
    pub bonus: u32,
    pub missed: u16,
    pub last_completed: u32,
    pub charity_percentage: u8,
    pub trainer_percentage: u8,
}

impl CampaignData {
    /// Unpack a 32-byte slot.
    pub fn from_slot(slot: &[u8; 32]) -> Self {
        Self {
            nonce: u16::from_be_bytes([slot[0], slot[1]]),
            length: slot[2],
            frequency: slot[3],
            cooldown: slot[4],
            stake: u32::from_be_bytes([slot[5], slot[6], slot[7], slot[8]]),
            completed: u16::from_be_bytes([slot[9], slot[10]]),
            started: u32::from_be_bytes([slot[11], slot[12], slot[13], slot[14]]),
            bonus: u32::from_be_bytes([slot[15], slot[16], slot[17], slot[18]]),
            missed: u16::from_be_bytes([slot[19], slot[20]]),
            last_completed: u32::from_be_bytes([slot[21], slot[22], slot[23], slot[24]]),
            charity_percentage: slot[25],
            trainer_percentage: slot[26],
        }
    }

    /// Parse a hex string (with or without `0x`) into a campaign record.
    pub fn from_hex(s: &str) -> Result<Self, IndexerError> {
        let h = s.strip_prefix("0x").unwrap_or(s);
        if h.len() != 64 {
            return Err(IndexerError::Decode(format!(
                "campaign data must be 32 bytes, got {} hex chars",
                h.len()
            )));
        }
        let bytes =
            hex::decode(h).map_err(|e| IndexerError::Decode(format!("campaign data: {e}")))?;
        let mut slot = [0u8; 32];
        slot.copy_from_slice(&bytes);
        Ok(Self::from_slot(&slot))
    }

    /// Pack back into the 32-byte slot representation.
    pub fn to_slot(&self) -> [u8; 32] {
        let mut slot = [0u8; 32];
        slot[0..2].copy_from_slice(&self.nonce.to_be_bytes());
        slot[2] = self.length;
        slot[3] = self.frequency;
        slot[4] = self.cooldown;
        slot[5..9].copy_from_slice(&self.stake.to_be_bytes());
        slot[9..11].copy_from_slice(&self.completed.to_be_bytes());
        slot[11..15].copy_from_slice(&self.started.to_be_bytes());
        slot[15..19].copy_from_slice(&self.bonus.to_be_bytes());
        slot[19..21].copy_from_slice(&self.missed.to_be_bytes());
        slot[21..25].copy_from_slice(&self.last_completed.to_be_bytes());
        slot[25] = self.charity_percentage;
        slot[26] = self.trainer_percentage;
        slot
    }

    /// Hex encoding of the packed slot, `0x`-prefixed.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_slot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_known_slot() {
        // nonce=1, length=10, frequency=3, cooldown=2, stake=5000,
        // charity=10%, trainer=5%, everything else zero
        let hex = "0x00010a030200001388000000000000000000000000000000000a050000000000";
        let data = CampaignData::from_hex(hex).unwrap();
        assert_eq!(data.nonce, 1);
        assert_eq!(data.length, 10);
        assert_eq!(data.frequency, 3);
        assert_eq!(data.cooldown, 2);
        assert_eq!(data.stake, 5_000);
        assert_eq!(data.completed, 0);
        assert_eq!(data.charity_percentage, 10);
        assert_eq!(data.trainer_percentage, 5);
    }

    #[test]
    fn pack_matches_unpack() {
        let data = CampaignData {
            nonce: 7,
            length: 30,
            frequency: 5,
            cooldown: 1,
            stake: 1_000_000,
            completed: 12,
            started: 1_520_000_000,
            bonus: 250,
            missed: 2,
            last_completed: 1_520_600_000,
            charity_percentage: 50,
            trainer_percentage: 20,
        };
        assert_eq!(CampaignData::from_slot(&data.to_slot()), data);
    }

    #[test]
    fn rejects_short_input() {
        let err = CampaignData::from_hex("0xdeadbeef").unwrap_err();
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "zz".repeat(32);
        assert!(CampaignData::from_hex(&bad).is_err());
    }

    #[test]
    fn accepts_unprefixed_hex() {
        let hex = "00010a030200001388000000000000000000000000000000000a050000000000";
        assert!(CampaignData::from_hex(hex).is_ok());
    }
}
