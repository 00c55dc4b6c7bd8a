//! The chain handler contract: the full capability set a supported chain
//! must implement, plus the handler-side error taxonomy.
//!
//! A handler owns all network and session state for one chain. The
//! orchestrator only ever talks to `dyn ChainHandler`, so adding a chain
//! means implementing this trait and registering it.

mod ink;
mod registry;

pub use ink::InkHandler;
pub use registry::{HandlerRegistry, RegistryError};

use async_trait::async_trait;

use crate::error::codes;
use crate::message::{Bytes, CrossChainMessage, FormatError, MessageKey};

/// Failures of plain queries and transactions against a handler's chain.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    /// Remote query failed or timed out. Recoverable: retry next tick.
    #[error("remote query failed: {0}")]
    Query(String),
    /// A submitted transaction did not commit.
    #[error("transaction failed: {0}")]
    Transaction(String),
    /// The remote answered with a shape the handler cannot interpret.
    #[error("unexpected query result: {0}")]
    BadReply(String),
}

/// Failure points of [`ChainHandler::sent_message`], each distinct so the
/// caller can decide between retrying and abandoning the slot.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// Remote call failed. Recoverable: retry next tick.
    #[error("remote query failed: {0}")]
    Query(String),
    /// The message's sqos entries could not be decoded.
    #[error("sqos decode failed: {0}")]
    DecodeSqos(String),
    /// The payload bytes could not be decoded.
    #[error("payload decode failed: {0}")]
    DecodeData(String),
    /// Shape translation from the chain's wire form failed.
    #[error("message translation failed: {0}")]
    ToCoreMessage(String),
    /// The translated message failed format validation.
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl FetchError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FetchError::Query(_))
    }

    /// The abandon code recorded on the destination ledger, `None` for
    /// recoverable failures that must not abandon the slot.
    pub fn abandon_code(&self) -> Option<u16> {
        match self {
            FetchError::Query(_) => None,
            FetchError::DecodeSqos(_) => Some(codes::DECODE_SQOS),
            FetchError::DecodeData(_) => Some(codes::DECODE_DATA),
            FetchError::ToCoreMessage(_) => Some(codes::TO_CORE_MESSAGE),
            FetchError::Format(_) => Some(codes::MESSAGE_FORMAT),
        }
    }
}

/// Failure points of [`ChainHandler::push_message`].
#[derive(thiserror::Error, Debug)]
pub enum PushError {
    /// A read needed by the push (e.g. the destination contract's SQoS)
    /// failed. Recoverable: retry next tick, do not abandon.
    #[error("remote query failed: {0}")]
    Query(String),
    #[error("sqos encode failed: {0}")]
    EncodeSqos(String),
    #[error("payload encode failed: {0}")]
    EncodeData(String),
    /// Shape translation into the chain's wire form failed.
    #[error("message translation failed: {0}")]
    ToTargetMessage(String),
    /// The delivery (or commit/reveal) transaction did not commit.
    #[error("send transaction failed: {0}")]
    SendTransaction(String),
}

impl PushError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PushError::Query(_))
    }

    /// The abandon code recorded on the destination ledger, `None` for
    /// recoverable failures that must not abandon the slot.
    pub fn abandon_code(&self) -> Option<u16> {
        match self {
            PushError::Query(_) => None,
            PushError::EncodeSqos(_) => Some(codes::ENCODE_SQOS),
            PushError::EncodeData(_) => Some(codes::ENCODE_DATA),
            PushError::ToTargetMessage(_) => Some(codes::TO_TARGET_MESSAGE),
            PushError::SendTransaction(_) => Some(codes::SEND_TRANSACTION),
        }
    }
}

/// How a push concluded when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The full message was submitted for inbound delivery.
    Delivered,
    /// Reveal hidden phase: only the commitment hash was submitted.
    Committed,
    /// Our commit or reveal was already on the ledger; nothing was sent.
    AlreadySubmitted,
    /// Completed Reveal slot this relayer never committed to; delivery is
    /// not permitted and nothing was sent.
    Skipped,
}

/// One distinct message version received for a slot, with the submitters
/// that vouched for it. Under Reveal/Challenge SQoS a slot can hold several
/// competing groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageGroup {
    pub hash: [u8; 32],
    /// Destination contract the group's message targets.
    pub contract: Bytes,
    pub submitters: Vec<String>,
}

/// Everything recorded for a slot on the receiving side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedState {
    pub groups: Vec<MessageGroup>,
    pub completed: bool,
    /// When the slot last received a candidate, milliseconds since the epoch.
    pub last_received_ms: u128,
}

/// The operation set every chain adapter implements.
#[async_trait]
pub trait ChainHandler: Send + Sync {
    /// The configured name of the chain this handler serves.
    fn chain_name(&self) -> &str;

    /// How many messages this chain has sent towards `to_chain`.
    async fn sent_message_count(&self, to_chain: &str) -> Result<u128, HandlerError>;

    /// The next message id this chain expects from `from_chain`. `0` is a
    /// sentinel meaning this process is not a registered relayer for the
    /// route; callers must skip the route rather than treat it as an id.
    async fn next_message_id(&self, from_chain: &str) -> Result<u128, HandlerError>;

    /// Fetches and translates one sent message.
    async fn sent_message(&self, to_chain: &str, id: u128)
        -> Result<CrossChainMessage, FetchError>;

    /// Submits a message for inbound delivery, honoring the destination
    /// contract's Reveal policy when one is configured.
    async fn push_message(&self, message: &CrossChainMessage) -> Result<PushOutcome, PushError>;

    /// Finalizes a delivered message. Re-execution is rejected by the
    /// ledger, not retried here.
    async fn execute_message(&self, from_chain: &str, id: u128) -> Result<(), HandlerError>;

    /// Permanently records failure for a slot and advances the route past it.
    async fn abandon_message(
        &self,
        from_chain: &str,
        id: u128,
        error_code: u16,
    ) -> Result<(), HandlerError>;

    /// All slots currently eligible for finalization review.
    async fn executable_messages(
        &self,
        from_chains: &[String],
    ) -> Result<Vec<MessageKey>, HandlerError>;

    /// The currently recorded canonical hash for one slot.
    async fn executable_message_hash(
        &self,
        from_chain: &str,
        id: u128,
    ) -> Result<[u8; 32], HandlerError>;

    /// Every distinct message version received for a slot, plus completion
    /// state.
    async fn received_message(
        &self,
        from_chain: &str,
        id: u128,
    ) -> Result<ReceivedState, HandlerError>;

    /// Runs the Challenge protocol for a slot against a candidate fetched
    /// from the source chain. `true` means the slot is executable; `false`
    /// defers it to a later pass. Detected fraud is not an error.
    async fn challenge(
        &self,
        candidate: &CrossChainMessage,
        key: &MessageKey,
    ) -> Result<bool, HandlerError>;
}

impl std::fmt::Debug for dyn ChainHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainHandler")
            .field("chain_name", &self.chain_name())
            .finish_non_exhaustive()
    }
}
