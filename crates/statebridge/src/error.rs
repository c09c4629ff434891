//! Error types for the bridge facade.

use statebridge_core::{CoreError, StoreKey};
use thiserror::Error;

/// Errors that can occur in caller-facing bridge operations.
///
/// Inbound envelope handling never produces these: problems on the
/// receive path are logged and the envelope is dropped.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// This context has no host transport.
    #[error("bridge not supported in this context")]
    Unsupported,

    /// Key or envelope error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// The first snapshot did not arrive in time.
    #[error("timed out waiting for store {0}")]
    Timeout(StoreKey),

    /// The store's readiness signal went away.
    #[error("bridge closed")]
    Closed,
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
