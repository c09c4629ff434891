//! # Statebridge Sync
//!
//! Differential state transfer between the host and its mirrors.
//!
//! ## Overview
//!
//! The host side is a [`FanOut`]: it receives every authoritative
//! transition from the registry, decides patch versus full snapshot against
//! the last broadcast baseline, and sends one envelope to every attached
//! [`Endpoint`]. The mirror side is a [`MirrorRegistry`] of
//! [`MirrorStore`]s that rebuild state from those envelopes and ask for a
//! full snapshot whenever a patch does not apply.
//!
//! ## Key Properties
//!
//! - **Catch-up on attach**: a new endpoint receives the latest full
//!   snapshot of every key before any patch
//! - **Baseline first**: the broadcast baseline is updated before sending
//! - **Independent endpoints**: one failing endpoint never blocks others
//! - **Fallback convergence**: a divergent patch is dropped whole and
//!   answered with `REQUEST_FULL_STATE`
//!
//! ## Message Flow
//!
//! ```text
//! Mirror                                   Host
//!   |-------- INIT_STORE ------------------>|
//!   |<------- STATE_UPDATE -----------------|
//!   |-------- EVENT ----------------------->|  reducer runs
//!   |<------- STATE_PATCH ------------------|  smaller than snapshot
//!   |   (patch does not apply)              |
//!   |-------- REQUEST_FULL_STATE ---------->|
//!   |<------- STATE_UPDATE -----------------|
//! ```

pub mod convergence;
pub mod error;
pub mod fanout;
pub mod mirror;
pub mod transport;

pub use convergence::{verify_convergence, ConvergenceResult};
pub use error::{Result, SyncError};
pub use fanout::{BroadcastReport, FanOut};
pub use mirror::{ApplyOutcome, MirrorRegistry, MirrorStore};
pub use transport::{
    memory::MemoryEndpoint, memory::MemoryLink, memory::MemoryMirrorTransport, Endpoint,
    EndpointId, MirrorTransport,
};
