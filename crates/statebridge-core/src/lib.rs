//! # Statebridge Core
//!
//! Pure primitives for statebridge: store keys, the wire envelope, JSON
//! pointer paths, the differ and state digests.
//!
//! This crate contains no I/O, no transport, no subscriber bookkeeping. It is
//! pure computation over JSON state snapshots.
//!
//! ## Key Types
//!
//! - [`StoreKey`] - Names one feature's store within a bridge
//! - [`Envelope`] - The serialized unit crossing the host/mirror boundary
//! - [`PatchOp`] - One structural operation (`add`, `remove`, `replace`)
//! - [`Transfer`] - The differ's choice between patch and full snapshot
//! - [`StateDigest`] - Blake3 digest of a snapshot's canonical JSON
//!
//! ## Differential Transfer
//!
//! ```rust
//! use serde_json::json;
//! use statebridge_core::{apply_patch, diff};
//!
//! let before = json!({ "count": 0 });
//! let after = json!({ "count": 1 });
//!
//! let patches = diff(&before, &after);
//! assert_eq!(apply_patch(&before, &patches).unwrap(), after);
//! ```

pub mod digest;
pub mod envelope;
pub mod error;
pub mod patch;
pub mod pointer;
pub mod produce;
pub mod transfer;
pub mod types;

pub use digest::StateDigest;
pub use envelope::{Envelope, EnvelopeKind};
pub use error::{CoreError, PatchError, Result};
pub use patch::{apply_patch, diff, PatchOp, PatchSet};
pub use produce::produce;
pub use transfer::{plan_transfer, Transfer};
pub use types::StoreKey;
