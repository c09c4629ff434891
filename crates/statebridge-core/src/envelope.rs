//! Wire envelope for cross-boundary traffic.
//!
//! Every message between host and mirror is one JSON object tagged by
//! `type`:
//!
//! ```text
//! { "type": "INIT_STORE",         "key": "counter" }
//! { "type": "STATE_UPDATE",       "key": "counter", "payload": { "count": 1 } }
//! { "type": "STATE_PATCH",        "key": "counter", "patches": [ ... ] }
//! { "type": "EVENT",              "key": "counter", "event": { "type": "INCREMENT" } }
//! { "type": "REQUEST_FULL_STATE", "key": "counter" }
//! ```
//!
//! Decoding is exhaustive over the five kinds; anything else is rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::patch::PatchSet;
use crate::types::StoreKey;

/// A message crossing the host/mirror boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
    /// Mirror → host: a mirror store was created for `key`.
    InitStore { key: StoreKey },

    /// Host → mirror: full snapshot.
    StateUpdate {
        key: StoreKey,
        payload: Value,
    },

    /// Host → mirror: patch against the last broadcast snapshot.
    StatePatch { key: StoreKey, patches: PatchSet },

    /// Mirror → host: request a state transition.
    Event {
        key: StoreKey,
        event: Value,
    },

    /// Mirror → host: a patch failed to apply, resend the full snapshot.
    RequestFullState { key: StoreKey },
}

/// Discriminant of an [`Envelope`], for logging and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    InitStore,
    StateUpdate,
    StatePatch,
    Event,
    RequestFullState,
}

impl EnvelopeKind {
    /// The wire name of this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EnvelopeKind::InitStore => "INIT_STORE",
            EnvelopeKind::StateUpdate => "STATE_UPDATE",
            EnvelopeKind::StatePatch => "STATE_PATCH",
            EnvelopeKind::Event => "EVENT",
            EnvelopeKind::RequestFullState => "REQUEST_FULL_STATE",
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Envelope {
    /// The store key this envelope is addressed to.
    pub fn key(&self) -> &StoreKey {
        match self {
            Envelope::InitStore { key }
            | Envelope::StateUpdate { key, .. }
            | Envelope::StatePatch { key, .. }
            | Envelope::Event { key, .. }
            | Envelope::RequestFullState { key } => key,
        }
    }

    /// The kind of this envelope.
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::InitStore { .. } => EnvelopeKind::InitStore,
            Envelope::StateUpdate { .. } => EnvelopeKind::StateUpdate,
            Envelope::StatePatch { .. } => EnvelopeKind::StatePatch,
            Envelope::Event { .. } => EnvelopeKind::Event,
            Envelope::RequestFullState { .. } => EnvelopeKind::RequestFullState,
        }
    }

    /// Serialize to the JSON text handed to the transport.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::Encoding(e.to_string()))
    }

    /// Parse JSON text received from the transport.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CoreError::Decoding(e.to_string()))
    }
}
