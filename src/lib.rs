//! Cross-chain message relay core.
//!
//! Messages created on one ledger are fetched, translated through a
//! chain-neutral model, delivered to their destination ledger and finalized
//! there, under the service-quality (SQoS) policies the destination contract
//! configures. The crate provides the payload codec, the message model with
//! its canonical hash form, the [`handler::ChainHandler`] contract each
//! supported chain implements, and the orchestrator that drives send and
//! execute passes per chain.
//!
//! All relay progress lives on the ledgers themselves; the process keeps no
//! durable state and can be restarted at any point.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod payload;
pub mod relayer;
pub mod sqos;

pub use client::{ChainClient, ClientError, KeyStore, KeyStoreError, Signer, StaticKeyStore};
pub use config::{Config, ConfigError, NetworkConfig};
pub use error::{Recoverability, RelayError};
pub use handler::{
    ChainHandler, FetchError, HandlerError, HandlerRegistry, InkHandler, PushError, PushOutcome,
};
pub use message::{
    canonical_bytes, canonical_hash, commitment_hash, validate, CrossChainMessage, FormatError,
    MessageKey, SqosItem, SqosType,
};
pub use payload::{decode_payload, encode_payload, CodecError, PayloadItem, PayloadValue};
pub use relayer::{Relayer, RelayerManager};

pub type Result<T> = std::result::Result<T, RelayError>;
