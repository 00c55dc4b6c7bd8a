//! Static relay configuration: one entry per supported chain, read once at
//! startup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("chain {chain} lists unknown receive chain {peer}")]
    UnknownPeer { chain: String, peer: String },
}

/// Per-chain network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// RPC endpoint URL.
    pub node_address: String,
    /// Address of the cross-chain contract on this chain.
    pub cross_chain_contract_address: String,
    /// Which adapter family the chain speaks (e.g. "ink").
    pub compatible_chain: String,
    /// Chains this one accepts inbound messages from.
    #[serde(default)]
    pub receive_chains: Vec<String>,
}

/// Whole-process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pause between orchestrator ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    pub networks: BTreeMap<String, NetworkConfig>,
}

fn default_tick_interval_ms() -> u64 {
    5_000
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.check_peers()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Every receive chain must itself be a configured network.
    fn check_peers(&self) -> Result<(), ConfigError> {
        for (chain, network) in &self.networks {
            for peer in &network.receive_chains {
                if !self.networks.contains_key(peer) {
                    return Err(ConfigError::UnknownPeer {
                        chain: chain.clone(),
                        peer: peer.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
