//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur while moving envelopes across the boundary.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The other side of the link is gone.
    #[error("transport closed")]
    Closed,

    /// Envelope encoding or decoding failed.
    #[error("core error: {0}")]
    Core(#[from] statebridge_core::CoreError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
