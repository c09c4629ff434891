//! Error types for statebridge core.

use thiserror::Error;

/// Core errors that can occur while handling keys and envelopes.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid store key: {0}")]
    InvalidKey(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("patch error: {0}")]
    Patch(#[from] PatchError),
}

/// Errors raised when a patch does not match the document it is applied to.
///
/// Any of these means the mirror's snapshot has diverged from the host's
/// baseline; the patch is discarded as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("invalid JSON pointer: {0:?}")]
    InvalidPointer(String),

    #[error("path not found: {0:?}")]
    PathNotFound(String),

    #[error("array index out of bounds at {path:?}: index {index}, length {len}")]
    IndexOutOfBounds { path: String, index: usize, len: usize },

    #[error("invalid array index {token:?} at {path:?}")]
    InvalidIndex { path: String, token: String },

    #[error("cannot remove the document root")]
    RemoveRoot,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

