//! Raw log → event decoding.
//!
//! topic0 of an EVM log is the keccak256 of the event's canonical signature.
//! The decoder computes the five known fingerprints at construction and
//! matches incoming logs against them; everything else on the watched
//! contract becomes `EventPayload::Unknown` so the processor's
//! unhandled-event path fires instead of the log being dropped.
//!
//! All event parameters are non-indexed, so they arrive ABI-encoded in the
//! log's data section as consecutive 32-byte words.

use tiny_keccak::{Hasher, Keccak};

use centive_core::{CampaignData, EventPayload, EventRecord, IndexerError};

use crate::fetcher::RawLog;

/// keccak256 of an event signature string, `0x`-prefixed.
fn signature_topic0(signature: &str) -> String {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut output);
    format!("0x{}", hex::encode(output))
}

/// The log data section, split into 32-byte words.
struct DataWords(Vec<[u8; 32]>);

impl DataWords {
    fn parse(data: &str) -> Result<Self, IndexerError> {
        let stripped = data.strip_prefix("0x").unwrap_or(data);
        let bytes =
            hex::decode(stripped).map_err(|e| IndexerError::Decode(format!("log data: {e}")))?;
        if bytes.len() % 32 != 0 {
            return Err(IndexerError::Decode(format!(
                "log data length {} is not word-aligned",
                bytes.len()
            )));
        }
        let words = bytes
            .chunks_exact(32)
            .map(|chunk| {
                let mut word = [0u8; 32];
                word.copy_from_slice(chunk);
                word
            })
            .collect();
        Ok(Self(words))
    }

    fn word(&self, index: usize) -> Result<[u8; 32], IndexerError> {
        self.0
            .get(index)
            .copied()
            .ok_or_else(|| IndexerError::Decode(format!("log data missing word {index}")))
    }

    /// An address parameter: the low 20 bytes of the word.
    fn address(&self, index: usize) -> Result<String, IndexerError> {
        let word = self.word(index)?;
        Ok(format!("0x{}", hex::encode(&word[12..])))
    }

    /// A uint16 parameter: the low 2 bytes of the word.
    fn uint16(&self, index: usize) -> Result<u16, IndexerError> {
        let word = self.word(index)?;
        Ok(u16::from_be_bytes([word[30], word[31]]))
    }

    /// A uint8 parameter: the low byte of the word.
    fn uint8(&self, index: usize) -> Result<u8, IndexerError> {
        Ok(self.word(index)?[31])
    }
}

/// Matches logs against the contract's event fingerprints.
pub struct LogDecoder {
    create_campaign: String,
    checkin: String,
    sponsor: String,
    donate: String,
    update_charity_percentage: String,
}

impl LogDecoder {
    pub fn new() -> Self {
        Self {
            create_campaign: signature_topic0("CreateCampaign(address,bytes32,address)"),
            checkin: signature_topic0("Checkin(address,uint16)"),
            sponsor: signature_topic0("Sponsor(address,uint16)"),
            donate: signature_topic0("Donate(bytes32)"),
            update_charity_percentage: signature_topic0("UpdateCharityPercentage(uint16,uint8)"),
        }
    }

    /// Decode one raw log into a positioned event record.
    pub fn decode(&self, log: &RawLog) -> Result<EventRecord, IndexerError> {
        let topic0 = log
            .topics
            .first()
            .ok_or_else(|| IndexerError::Decode("log has no topics".into()))?;

        let payload = if topic0.eq_ignore_ascii_case(&self.create_campaign) {
            let words = DataWords::parse(&log.data)?;
            EventPayload::CreateCampaign {
                user: words.address(0)?,
                data: CampaignData::from_slot(&words.word(1)?),
                trainer: words.address(2)?,
            }
        } else if topic0.eq_ignore_ascii_case(&self.checkin) {
            let words = DataWords::parse(&log.data)?;
            EventPayload::Checkin {
                user: words.address(0)?,
                nonce: words.uint16(1)?,
            }
        } else if topic0.eq_ignore_ascii_case(&self.sponsor) {
            let words = DataWords::parse(&log.data)?;
            EventPayload::Sponsor {
                user: words.address(0)?,
                nonce: words.uint16(1)?,
            }
        } else if topic0.eq_ignore_ascii_case(&self.donate) {
            let words = DataWords::parse(&log.data)?;
            EventPayload::Donate {
                data: CampaignData::from_slot(&words.word(0)?),
            }
        } else if topic0.eq_ignore_ascii_case(&self.update_charity_percentage) {
            let words = DataWords::parse(&log.data)?;
            EventPayload::UpdateCharityPercentage {
                nonce: words.uint16(0)?,
                charity_percentage: words.uint8(1)?,
            }
        } else {
            EventPayload::Unknown {
                topic0: topic0.clone(),
            }
        };

        Ok(EventRecord::new(
            log.block_number()?,
            log.log_index()?,
            payload,
        ))
    }
}

impl Default for LogDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "1111111111111111111111111111111111111111";
    const TRAINER: &str = "2222222222222222222222222222222222222222";

    fn address_word(addr: &str) -> String {
        format!("{:0>64}", addr)
    }

    fn uint_word(value: u64) -> String {
        format!("{value:064x}")
    }

    fn log(topic0: &str, data_words: &[String], block: u64, index: u32) -> RawLog {
        RawLog {
            address: "0xc0ffee".into(),
            topics: vec![topic0.to_string()],
            data: format!("0x{}", data_words.concat()),
            block_number: format!("0x{block:x}"),
            tx_hash: "0xbeef".into(),
            log_index: format!("0x{index:x}"),
            removed: None,
        }
    }

    #[test]
    fn decodes_create_campaign() {
        let decoder = LogDecoder::new();
        let slot = "00010a030200001388000000000000000000000000000000000a050000000000";
        let raw = log(
            &decoder.create_campaign,
            &[address_word(USER), slot.to_string(), address_word(TRAINER)],
            2_100_000,
            3,
        );

        let event = decoder.decode(&raw).unwrap();
        assert_eq!(event.block_number, 2_100_000);
        assert_eq!(event.log_index, 3);
        match event.payload {
            EventPayload::CreateCampaign {
                user,
                data,
                trainer,
            } => {
                assert_eq!(user, format!("0x{USER}"));
                assert_eq!(trainer, format!("0x{TRAINER}"));
                assert_eq!(data.nonce, 1);
                assert_eq!(data.stake, 5_000);
                assert_eq!(data.charity_percentage, 10);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn decodes_checkin() {
        let decoder = LogDecoder::new();
        let raw = log(
            &decoder.checkin,
            &[address_word(USER), uint_word(42)],
            100,
            0,
        );
        match decoder.decode(&raw).unwrap().payload {
            EventPayload::Checkin { user, nonce } => {
                assert_eq!(user, format!("0x{USER}"));
                assert_eq!(nonce, 42);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn decodes_update_charity_percentage() {
        let decoder = LogDecoder::new();
        let raw = log(
            &decoder.update_charity_percentage,
            &[uint_word(7), uint_word(25)],
            100,
            0,
        );
        match decoder.decode(&raw).unwrap().payload {
            EventPayload::UpdateCharityPercentage {
                nonce,
                charity_percentage,
            } => {
                assert_eq!(nonce, 7);
                assert_eq!(charity_percentage, 25);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn unknown_topic0_is_preserved() {
        let decoder = LogDecoder::new();
        let raw = log(
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
            &[],
            100,
            0,
        );
        match decoder.decode(&raw).unwrap().payload {
            EventPayload::Unknown { topic0 } => {
                assert!(topic0.starts_with("0xddf252ad"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn truncated_data_is_an_error() {
        let decoder = LogDecoder::new();
        let raw = log(&decoder.checkin, &[address_word(USER)], 100, 0);
        let err = decoder.decode(&raw).unwrap_err();
        assert!(err.to_string().contains("missing word 1"));
    }

    #[test]
    fn misaligned_data_is_an_error() {
        let decoder = LogDecoder::new();
        let mut raw = log(&decoder.checkin, &[], 100, 0);
        raw.data = "0xabcdef".into();
        assert!(decoder.decode(&raw).is_err());
    }

    #[test]
    fn no_topics_is_an_error() {
        let decoder = LogDecoder::new();
        let mut raw = log("0x0", &[], 100, 0);
        raw.topics.clear();
        assert!(decoder.decode(&raw).is_err());
    }

    #[test]
    fn known_fingerprint_value() {
        // spot-check against an externally computed keccak256
        assert_eq!(
            signature_topic0("Transfer(address,address,uint256)"),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }
}
