//! The bridge contract shared by host and mirror contexts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use statebridge_store::{DispatchOutcome, Store};

use crate::error::Result;

/// Configuration for a bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Send patches when they are smaller than the snapshot. When false,
    /// every transition goes out as a full `STATE_UPDATE`.
    pub patches_enabled: bool,
    /// Upper bound on how long `get_store` waits for the first snapshot.
    /// `None` waits indefinitely.
    pub ready_timeout: Option<Duration>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            patches_enabled: true,
            ready_timeout: None,
        }
    }
}

/// Per-context entry point consumed by UI bindings.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// The store type handed out by this bridge.
    type Store: Store + 'static;

    /// Whether this context is attached to a host. Constant for the
    /// lifetime of the bridge.
    fn is_supported(&self) -> bool;

    /// The store for `key`, once it holds at least one snapshot.
    ///
    /// Concurrent calls for the same key share one underlying store.
    async fn get_store(&self, key: &str) -> Result<Arc<Self::Store>>;
}

/// A bridge that can mutate state directly (host only).
pub trait MutableBridge: Bridge {
    /// Apply `recipe` to a copy of the state of `key` and broadcast the
    /// result.
    fn mutate<F>(&self, key: &str, recipe: F) -> Result<DispatchOutcome>
    where
        F: FnOnce(&mut Value);
}
