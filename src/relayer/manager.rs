//! Owns one [`Relayer`] per configured chain and drives the tick loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::RelayError;
use crate::handler::HandlerRegistry;

use super::Relayer;

/// Drives all per-chain relayers on a shared serial tick.
#[derive(Debug)]
pub struct RelayerManager {
    relayers: Vec<Relayer>,
    tick_interval: Duration,
}

impl RelayerManager {
    /// Builds one relayer per configured network. Every configured chain and
    /// every listed receive chain must already have a registered handler;
    /// a missing handler is fatal, not retried.
    pub async fn from_config(
        config: &Config,
        registry: Arc<HandlerRegistry>,
    ) -> Result<Self, RelayError> {
        let mut relayers = Vec::with_capacity(config.networks.len());
        for (chain, network) in &config.networks {
            registry.get(chain).await?;
            for peer in &network.receive_chains {
                registry.get(peer).await?;
            }
            relayers.push(Relayer::new(
                chain.clone(),
                network.receive_chains.clone(),
                registry.clone(),
            ));
        }
        info!(chains = relayers.len(), "relayer manager ready");
        Ok(Self {
            relayers,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
        })
    }

    pub fn chain_names(&self) -> Vec<&str> {
        self.relayers.iter().map(Relayer::chain_name).collect()
    }

    /// One full pass over every chain: send, then execute. Passes run
    /// strictly serially; each chain has a single signing account and
    /// concurrent submissions would race on its transaction nonce.
    pub async fn tick(&self) {
        for relayer in &self.relayers {
            debug!(chain = %relayer.chain_name(), "tick");
            relayer.send_pass().await;
            relayer.execute_pass().await;
        }
    }

    /// Runs ticks forever at the configured interval.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
