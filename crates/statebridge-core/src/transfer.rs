//! Patch-versus-snapshot selection.
//!
//! The host compares each new snapshot against the last one it broadcast
//! for the same key. A patch is only worth sending when its serialized
//! form is strictly smaller than the serialized snapshot: per-operation
//! overhead (`op`, `path`) easily exceeds the value for small or heavily
//! restructured states. Size is the only criterion.

use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::patch::{diff, PatchSet};

/// What the host should transmit for one state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transfer {
    /// Nothing changed since the last broadcast.
    Unchanged,
    /// Send the full snapshot (`STATE_UPDATE`).
    Full(Value),
    /// Send the patch set (`STATE_PATCH`).
    Patch(PatchSet),
}

impl Transfer {
    /// Returns true if nothing needs to be sent.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Transfer::Unchanged)
    }
}

/// Decide how to transmit `next` given the last broadcast snapshot.
///
/// With no previous baseline the full snapshot is always chosen.
pub fn plan_transfer(previous: Option<&Value>, next: &Value) -> Result<Transfer> {
    let Some(previous) = previous else {
        return Ok(Transfer::Full(next.clone()));
    };

    if previous == next {
        return Ok(Transfer::Unchanged);
    }

    let patches = diff(previous, next);
    let patch_size = serialized_len(&patches)?;
    let full_size = serialized_len(next)?;

    if patch_size >= full_size {
        Ok(Transfer::Full(next.clone()))
    } else {
        Ok(Transfer::Patch(patches))
    }
}

fn serialized_len<T: serde::Serialize + ?Sized>(value: &T) -> Result<usize> {
    serde_json::to_vec(value)
        .map(|bytes| bytes.len())
        .map_err(|e| CoreError::Encoding(e.to_string()))
}
