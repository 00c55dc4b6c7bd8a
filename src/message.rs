//! Cross-chain message model: value types, format validation and the
//! canonical byte form used for fraud detection.
//!
//! Messages are created on a source ledger, consumed exactly once by the
//! destination ledger and never reordered by the relay; `id` is assigned by
//! the source chain, strictly increasing per (from_chain, to_chain) route
//! and starting at 1.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::payload::{encode_payload, num_text, PayloadItem};

pub type Bytes = Vec<u8>;

/// Format violations detected by [`validate`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("sender must be 32 bytes, got {0}")]
    SenderLength(usize),
    #[error("signer must be 32 bytes, got {0}")]
    SignerLength(usize),
    #[error("contract must be 32 bytes, got {0}")]
    ContractLength(usize),
    #[error("action selector must be 4 bytes, got {0}")]
    ActionLength(usize),
    #[error("message id 0 is reserved, ids start at 1")]
    ZeroId,
    #[error("unrecognized sqos type code {0}")]
    UnknownSqosCode(u8),
    #[error("challenge window value must be 1..=16 bytes, got {0}")]
    ChallengeWindow(usize),
}

/// Service-quality policy kinds, by wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqosType {
    Reveal,
    Challenge,
    Threshold,
    Priority,
    ExceptionRollback,
    Anonymous,
    Identity,
    Isolation,
    CrossVerify,
}

impl SqosType {
    pub fn code(&self) -> u8 {
        match self {
            SqosType::Reveal => 0,
            SqosType::Challenge => 1,
            SqosType::Threshold => 2,
            SqosType::Priority => 3,
            SqosType::ExceptionRollback => 4,
            SqosType::Anonymous => 5,
            SqosType::Identity => 6,
            SqosType::Isolation => 7,
            SqosType::CrossVerify => 8,
        }
    }

    /// The contract-side variant name, as it appears at the chain boundary.
    pub fn name(&self) -> &'static str {
        match self {
            SqosType::Reveal => "Reveal",
            SqosType::Challenge => "Challenge",
            SqosType::Threshold => "Threshold",
            SqosType::Priority => "Priority",
            SqosType::ExceptionRollback => "ExceptionRollback",
            SqosType::Anonymous => "Anonymous",
            SqosType::Identity => "Identity",
            SqosType::Isolation => "Isolation",
            SqosType::CrossVerify => "CrossVerify",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Reveal" => SqosType::Reveal,
            "Challenge" => SqosType::Challenge,
            "Threshold" => SqosType::Threshold,
            "Priority" => SqosType::Priority,
            "ExceptionRollback" => SqosType::ExceptionRollback,
            "Anonymous" => SqosType::Anonymous,
            "Identity" => SqosType::Identity,
            "Isolation" => SqosType::Isolation,
            "CrossVerify" => SqosType::CrossVerify,
            _ => return None,
        })
    }
}

impl TryFrom<u8> for SqosType {
    type Error = FormatError;

    fn try_from(code: u8) -> Result<Self, FormatError> {
        Some(match code {
            0 => SqosType::Reveal,
            1 => SqosType::Challenge,
            2 => SqosType::Threshold,
            3 => SqosType::Priority,
            4 => SqosType::ExceptionRollback,
            5 => SqosType::Anonymous,
            6 => SqosType::Identity,
            7 => SqosType::Isolation,
            8 => SqosType::CrossVerify,
            _ => return Err(FormatError::UnknownSqosCode(code)),
        })
        .ok_or(FormatError::UnknownSqosCode(code))
    }
}

/// One service-quality policy entry; `value` bytes are type-specific.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqosItem {
    pub sqos_type: SqosType,
    pub value: Bytes,
}

impl SqosItem {
    pub fn new(sqos_type: SqosType, value: Bytes) -> Self {
        Self { sqos_type, value }
    }

    /// For a Challenge entry, the dispute window period in milliseconds,
    /// big-endian. `None` when the value bytes are unusable as a window.
    pub fn challenge_window_ms(&self) -> Option<u128> {
        if self.sqos_type != SqosType::Challenge {
            return None;
        }
        parse_window(&self.value)
    }
}

/// Big-endian window period of at most 16 bytes.
pub(crate) fn parse_window(bytes: &[u8]) -> Option<u128> {
    if bytes.is_empty() || bytes.len() > 16 {
        return None;
    }
    let mut buf = [0u8; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Some(u128::from_be_bytes(buf))
}

/// The application call carried by a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Destination contract, 32 bytes.
    pub contract: Bytes,
    /// 4-byte action selector.
    pub action: Bytes,
    /// Ordered application payload.
    pub data: Vec<PayloadItem>,
}

/// Session context linking a message to a wider request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(with = "num_text")]
    pub id: u128,
    pub session_type: u8,
    pub callback: Bytes,
    pub commitment: Bytes,
    pub answer: Bytes,
}

/// A message as relayed from one chain to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainMessage {
    #[serde(with = "num_text")]
    pub id: u128,
    pub from_chain: String,
    pub to_chain: String,
    /// Source-chain account that created the message, 32 bytes.
    pub sender: Bytes,
    /// Source-chain account that signed the submission, 32 bytes.
    pub signer: Bytes,
    pub sqos: Vec<SqosItem>,
    pub content: Content,
    pub session: Session,
}

/// A (chain, id) slot in a route's message sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageKey {
    pub chain: String,
    #[serde(with = "num_text")]
    pub id: u128,
}

impl MessageKey {
    pub fn new(chain: impl Into<String>, id: u128) -> Self {
        Self {
            chain: chain.into(),
            id,
        }
    }
}

/// Checks the fixed-width fields and sqos entries of a message.
///
/// Runs after decoding an inbound message, before it is forwarded, and
/// before encoding an outbound one.
pub fn validate(message: &CrossChainMessage) -> Result<(), FormatError> {
    if message.id == 0 {
        return Err(FormatError::ZeroId);
    }
    if message.sender.len() != 32 {
        return Err(FormatError::SenderLength(message.sender.len()));
    }
    if message.signer.len() != 32 {
        return Err(FormatError::SignerLength(message.signer.len()));
    }
    if message.content.contract.len() != 32 {
        return Err(FormatError::ContractLength(message.content.contract.len()));
    }
    if message.content.action.len() != 4 {
        return Err(FormatError::ActionLength(message.content.action.len()));
    }
    for item in &message.sqos {
        if item.sqos_type == SqosType::Challenge && parse_window(&item.value).is_none() {
            return Err(FormatError::ChallengeWindow(item.value.len()));
        }
    }
    Ok(())
}

/// The deterministic byte form hashed for fraud detection.
///
/// `to_chain` is deliberately excluded: the destination ledger derives it
/// from context, and both sides must hash identical bytes.
pub fn canonical_bytes(message: &CrossChainMessage) -> Bytes {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&message.id.to_be_bytes());
    bytes.extend_from_slice(message.from_chain.as_bytes());
    bytes.extend_from_slice(&message.sender);
    bytes.extend_from_slice(&message.signer);
    bytes.extend_from_slice(&message.content.contract);
    bytes.extend_from_slice(&message.content.action);
    bytes.extend_from_slice(&encode_payload(&message.content.data));
    bytes.extend_from_slice(&message.session.id.to_be_bytes());
    bytes.push(message.session.session_type);
    bytes.extend_from_slice(&message.session.callback);
    bytes.extend_from_slice(&message.session.commitment);
    bytes.extend_from_slice(&message.session.answer);
    bytes
}

/// SHA-256 of the canonical byte form.
pub fn canonical_hash(message: &CrossChainMessage) -> [u8; 32] {
    Sha256::digest(canonical_bytes(message)).into()
}

/// Commitment hash for the Reveal hidden phase: canonical bytes followed by
/// the submitter's public key, so a commit binds both the content and the
/// committer.
pub fn commitment_hash(message: &CrossChainMessage, public_key: &[u8]) -> [u8; 32] {
    let mut bytes = canonical_bytes(message);
    bytes.extend_from_slice(public_key);
    Sha256::digest(bytes).into()
}

/// Unit-test fixture shared across modules.
#[cfg(test)]
pub(crate) fn test_message(id: u128) -> CrossChainMessage {
    use crate::payload::PayloadValue;

    CrossChainMessage {
        id,
        from_chain: "PLATONEVMDEV".into(),
        to_chain: "SHIBUYA".into(),
        sender: vec![1; 32],
        signer: vec![2; 32],
        sqos: vec![],
        content: Content {
            contract: vec![3; 32],
            action: vec![0xde, 0xad, 0xbe, 0xef],
            data: vec![PayloadItem::new(
                "greeting",
                PayloadValue::String("hello".into()),
            )],
        },
        session: Session {
            id: 0,
            session_type: 0,
            callback: vec![],
            commitment: vec![],
            answer: vec![],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message(id: u128) -> CrossChainMessage {
        test_message(id)
    }

    #[test]
    fn valid_message_passes() {
        assert_eq!(validate(&sample_message(1)), Ok(()));
    }

    #[test]
    fn rejects_bad_field_lengths() {
        let mut m = sample_message(1);
        m.sender = vec![1; 20];
        assert_eq!(validate(&m), Err(FormatError::SenderLength(20)));

        let mut m = sample_message(1);
        m.signer.push(0);
        assert_eq!(validate(&m), Err(FormatError::SignerLength(33)));

        let mut m = sample_message(1);
        m.content.contract = vec![];
        assert_eq!(validate(&m), Err(FormatError::ContractLength(0)));

        let mut m = sample_message(1);
        m.content.action = vec![1, 2, 3];
        assert_eq!(validate(&m), Err(FormatError::ActionLength(3)));
    }

    #[test]
    fn rejects_zero_id() {
        assert_eq!(validate(&sample_message(0)), Err(FormatError::ZeroId));
    }

    #[test]
    fn rejects_unusable_challenge_window() {
        let mut m = sample_message(1);
        m.sqos.push(SqosItem::new(SqosType::Challenge, vec![]));
        assert_eq!(validate(&m), Err(FormatError::ChallengeWindow(0)));

        let mut m = sample_message(1);
        m.sqos.push(SqosItem::new(SqosType::Challenge, vec![0; 17]));
        assert_eq!(validate(&m), Err(FormatError::ChallengeWindow(17)));
    }

    #[test]
    fn challenge_window_parses_big_endian() {
        let item = SqosItem::new(SqosType::Challenge, vec![0x01, 0x00]);
        assert_eq!(item.challenge_window_ms(), Some(256));
        let item = SqosItem::new(SqosType::Reveal, vec![0x01]);
        assert_eq!(item.challenge_window_ms(), None);
    }

    #[test]
    fn sqos_codes_round_trip() {
        for code in 0u8..=8 {
            let t = SqosType::try_from(code).unwrap();
            assert_eq!(t.code(), code);
            assert_eq!(SqosType::from_name(t.name()), Some(t));
        }
        assert!(SqosType::try_from(9).is_err());
        assert!(SqosType::from_name("SelectionDelay").is_none());
    }

    #[test]
    fn canonical_hash_is_stable_and_content_sensitive() {
        let m = sample_message(7);
        assert_eq!(canonical_hash(&m), canonical_hash(&m.clone()));

        let mut other = m.clone();
        other.content.action = vec![0, 0, 0, 0];
        assert_ne!(canonical_hash(&m), canonical_hash(&other));

        // Changing only the destination does not change the hash.
        let mut rerouted = m.clone();
        rerouted.to_chain = "ELSEWHERE".into();
        assert_eq!(canonical_hash(&m), canonical_hash(&rerouted));
    }

    #[test]
    fn commitment_hash_binds_the_committer() {
        let m = sample_message(7);
        assert_ne!(commitment_hash(&m, &[1; 32]), commitment_hash(&m, &[2; 32]));
        assert_ne!(commitment_hash(&m, &[1; 32]), canonical_hash(&m));
    }

    #[test]
    fn message_id_serializes_as_decimal_text() {
        let m = sample_message(u128::MAX);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["id"], serde_json::json!(u128::MAX.to_string()));
        let back: CrossChainMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }
}
