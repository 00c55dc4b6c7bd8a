//! Top-level error type and the recoverability classification driving the
//! orchestrator's retry/abandon/halt decisions.

use crate::client::{ClientError, KeyStoreError};
use crate::config::ConfigError;
use crate::handler::{FetchError, HandlerError, PushError, RegistryError};
use crate::message::FormatError;
use crate::payload::CodecError;

/// Error codes recorded on the destination ledger when a slot is abandoned.
/// Part of the contract interface; values must stay stable.
pub mod codes {
    pub const SUCCESS: u16 = 0;
    pub const GET_MESSAGE: u16 = 1;
    pub const DECODE_SQOS: u16 = 2;
    pub const DECODE_DATA: u16 = 3;
    pub const TO_CORE_MESSAGE: u16 = 4;
    pub const MESSAGE_FORMAT: u16 = 5;
    pub const ENCODE_SQOS: u16 = 6;
    pub const ENCODE_DATA: u16 = 7;
    pub const TO_TARGET_MESSAGE: u16 = 8;
    pub const SEND_TRANSACTION: u16 = 9;
}

/// How the orchestrator must react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recoverability {
    /// Transient remote failure: log, retry next tick, no state change.
    Recoverable,
    /// Application reject: abandon the slot with this code so the route
    /// advances past it.
    Reject(u16),
    /// The process cannot meaningfully continue (construction/config).
    Fatal,
}

/// Umbrella error for the relay core.
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Push(#[from] PushError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl RelayError {
    pub fn recoverability(&self) -> Recoverability {
        match self {
            RelayError::Config(_) | RelayError::KeyStore(_) | RelayError::Registry(_) => {
                Recoverability::Fatal
            }
            RelayError::Handler(_) => Recoverability::Recoverable,
            RelayError::Fetch(e) => match e.abandon_code() {
                Some(code) => Recoverability::Reject(code),
                None => Recoverability::Recoverable,
            },
            RelayError::Push(e) => match e.abandon_code() {
                Some(code) => Recoverability::Reject(code),
                None => Recoverability::Recoverable,
            },
            RelayError::Client(ClientError::Network(_)) => Recoverability::Recoverable,
            RelayError::Client(_) => Recoverability::Reject(codes::SEND_TRANSACTION),
            RelayError::Codec(_) => Recoverability::Reject(codes::DECODE_DATA),
            RelayError::Format(_) => Recoverability::Reject(codes::MESSAGE_FORMAT),
        }
    }
}
