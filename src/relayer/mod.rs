//! Per-chain relay orchestration.
//!
//! A [`Relayer`] serves one destination chain. Each tick it runs a send pass
//! (advance every inbound route by at most one message) and an execute pass
//! (review and finalize delivered slots). All progress state lives on the
//! ledgers, so a restart resumes exactly where the chains say it should.

mod manager;

pub use manager::RelayerManager;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{Recoverability, RelayError};
use crate::handler::{ChainHandler, HandlerRegistry};

/// Relays messages into one destination chain from its configured sources.
#[derive(Debug)]
pub struct Relayer {
    chain_name: String,
    receive_chains: Vec<String>,
    registry: Arc<HandlerRegistry>,
}

impl Relayer {
    pub fn new(
        chain_name: impl Into<String>,
        receive_chains: Vec<String>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            chain_name: chain_name.into(),
            receive_chains,
            registry,
        }
    }

    pub fn chain_name(&self) -> &str {
        &self.chain_name
    }

    /// Advances every inbound route by at most one message. Route failures
    /// are contained per route; a broken source never stalls the others.
    pub async fn send_pass(&self) {
        for source in &self.receive_chains {
            if let Err(err) = self.relay_from(source).await {
                match err.recoverability() {
                    Recoverability::Recoverable => {
                        warn!(%err, source, chain = %self.chain_name, "route pass failed, will retry");
                    }
                    _ => {
                        error!(%err, source, chain = %self.chain_name, "route pass failed");
                    }
                }
            }
        }
    }

    /// One step of the `source -> self` route: fetch the next expected
    /// message and push it. Rejects abandon the slot so the route advances.
    async fn relay_from(&self, source: &str) -> Result<(), RelayError> {
        let dest = self.registry.get(&self.chain_name).await?;
        let src = self.registry.get(source).await?;

        let next_id = dest.next_message_id(source).await?;
        if next_id == 0 {
            // Sentinel: this process is not a registered relayer for the route.
            debug!(source, chain = %self.chain_name, "not a relayer for route, skipping");
            return Ok(());
        }
        let count = src.sent_message_count(&self.chain_name).await?;
        if next_id > count {
            return Ok(());
        }

        let message = match src.sent_message(&self.chain_name, next_id).await {
            Ok(message) => message,
            Err(err) => {
                return self
                    .reject_or_bubble(dest.as_ref(), source, next_id, err.into())
                    .await;
            }
        };
        match dest.push_message(&message).await {
            Ok(outcome) => {
                info!(
                    source,
                    chain = %self.chain_name,
                    id = %next_id,
                    ?outcome,
                    "relayed message"
                );
                Ok(())
            }
            Err(err) => {
                self.reject_or_bubble(dest.as_ref(), source, next_id, err.into())
                    .await
            }
        }
    }

    /// Abandons the slot for application rejects; bubbles everything else up
    /// to be retried next tick.
    async fn reject_or_bubble(
        &self,
        dest: &dyn ChainHandler,
        source: &str,
        id: u128,
        err: RelayError,
    ) -> Result<(), RelayError> {
        match err.recoverability() {
            Recoverability::Reject(code) => {
                warn!(%err, source, id = %id, code, "abandoning message slot");
                dest.abandon_message(source, id, code).await?;
                Ok(())
            }
            _ => Err(err),
        }
    }

    /// Reviews every slot the destination reports as executable and
    /// finalizes the ones that pass Challenge review.
    pub async fn execute_pass(&self) {
        if let Err(err) = self.execute_ready().await {
            match err.recoverability() {
                Recoverability::Recoverable => {
                    warn!(%err, chain = %self.chain_name, "execute pass failed, will retry");
                }
                _ => {
                    error!(%err, chain = %self.chain_name, "execute pass failed");
                }
            }
        }
    }

    async fn execute_ready(&self) -> Result<(), RelayError> {
        let dest = self.registry.get(&self.chain_name).await?;
        let keys = dest.executable_messages(&self.receive_chains).await?;
        if keys.is_empty() {
            return Ok(());
        }
        debug!(chain = %self.chain_name, count = keys.len(), "reviewing executable messages");

        for key in keys {
            let src = match self.registry.get(&key.chain).await {
                Ok(src) => src,
                Err(err) => {
                    warn!(%err, from = %key.chain, "executable message from unconfigured chain");
                    continue;
                }
            };
            // The candidate is re-fetched from the source so the review
            // compares against ground truth, not our own earlier submission.
            let candidate = match src.sent_message(&self.chain_name, key.id).await {
                Ok(candidate) => candidate,
                Err(err) => {
                    warn!(
                        %err,
                        from = %key.chain,
                        id = %key.id,
                        "could not fetch candidate for review"
                    );
                    continue;
                }
            };
            if dest.challenge(&candidate, &key).await? {
                dest.execute_message(&key.chain, key.id).await?;
            }
        }
        Ok(())
    }
}
