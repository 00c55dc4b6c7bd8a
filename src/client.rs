//! External collaborator interfaces: the chain RPC client and the signing
//! key store.
//!
//! Connection and session lifecycle (connect, reconnect, key decryption)
//! live entirely behind these traits; the core only issues queries and
//! submits signed transactions.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Errors surfaced by a chain client.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// Remote round trip failed or timed out. Always treated as recoverable:
    /// the caller retries on a later tick.
    #[error("network error: {0}")]
    Network(String),
    /// The transaction was submitted but not committed.
    #[error("transaction failed: {0}")]
    Transaction(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A connected chain endpoint able to run contract queries and submit
/// signed transactions.
///
/// Arguments and results cross this boundary as JSON values; wide integers
/// travel as decimal text and byte fields as hex text.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Runs a read-only contract method.
    async fn query(&self, method: &str, args: &[Value]) -> Result<Value, ClientError>;

    /// Signs and submits a contract transaction, waiting for commitment.
    async fn submit(&self, method: &str, args: &[Value]) -> Result<(), ClientError>;
}

/// The relay process's identity on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Signer {
    /// Account address in the chain's text form.
    pub address: String,
    /// Public key bytes, bound into Reveal commitments.
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
}

#[derive(thiserror::Error, Debug)]
pub enum KeyStoreError {
    #[error("no signer configured for chain {0}")]
    MissingSigner(String),
    #[error("failed to read key store: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed key store: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Provides a per-chain signer. Key loading and unlocking mechanics are the
/// implementation's concern.
pub trait KeyStore: Send + Sync {
    fn signer(&self, chain: &str) -> Result<Signer, KeyStoreError>;
}

/// Key store backed by a static chain-to-signer map, loadable from a JSON
/// secret file of the form `{ "CHAIN": { "address": "...",
/// "public_key": "<hex>" } }`.
#[derive(Debug, Default)]
pub struct StaticKeyStore {
    signers: HashMap<String, Signer>,
}

impl StaticKeyStore {
    pub fn new(signers: HashMap<String, Signer>) -> Self {
        Self { signers }
    }

    pub fn from_json_str(json: &str) -> Result<Self, KeyStoreError> {
        let signers: HashMap<String, Signer> = serde_json::from_str(json)?;
        Ok(Self { signers })
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, KeyStoreError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

impl KeyStore for StaticKeyStore {
    fn signer(&self, chain: &str) -> Result<Signer, KeyStoreError> {
        self.signers
            .get(chain)
            .cloned()
            .ok_or_else(|| KeyStoreError::MissingSigner(chain.to_string()))
    }
}
