//! Registry mapping chain names to their handlers.
//!
//! Built once at startup and passed by reference; there is no ambient
//! global. Handlers are shared, so lookups hand out `Arc` clones.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::ChainHandler;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("handler for chain {0} already registered")]
    AlreadyRegistered(String),
    #[error("no handler registered for chain {0}")]
    NotFound(String),
}

/// Thread-safe registry of chain handlers, keyed by chain name.
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn ChainHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a handler under its own chain name. Duplicate registration
    /// is an error: one chain, one handler, one signer.
    pub async fn register(&self, handler: Arc<dyn ChainHandler>) -> Result<(), RegistryError> {
        let name = handler.chain_name().to_string();
        let mut handlers = self.handlers.write().await;
        if handlers.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        tracing::info!(chain = %name, "registered chain handler");
        handlers.insert(name, handler);
        Ok(())
    }

    pub async fn get(&self, chain: &str) -> Result<Arc<dyn ChainHandler>, RegistryError> {
        let handlers = self.handlers.read().await;
        handlers
            .get(chain)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(chain.to_string()))
    }

    pub async fn contains(&self, chain: &str) -> bool {
        self.handlers.read().await.contains_key(chain)
    }

    pub async fn chain_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.handlers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handlers.read().await.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &"<opaque>")
            .finish()
    }
}
