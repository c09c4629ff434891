//! Transport abstraction for envelope delivery.
//!
//! The bridge never owns the physical channel (a webview `postMessage`, a
//! native message handler, a socket). It is handed capabilities instead:
//!
//! - host side: one [`Endpoint`] per attached mirror, able to accept
//!   serialized envelopes;
//! - mirror side: a [`MirrorTransport`] that sends to the host and reports
//!   whether a host is reachable at all.
//!
//! Delivery in the other direction is push-style: whoever owns the channel
//! forwards received text to the bridge's `receive`. The transport is
//! expected to deliver in send order; loss is tolerated, reordering is not.

use std::fmt;

use crate::error::Result;

/// Host-side handle onto one attached mirror.
pub trait Endpoint: Send + Sync {
    /// Send one serialized envelope. Must not block on the receiver.
    fn send(&self, message: &str) -> Result<()>;
}

/// Mirror-side capability for talking to the host.
pub trait MirrorTransport: Send + Sync {
    /// Send one serialized envelope to the host.
    fn send(&self, message: &str) -> Result<()>;

    /// Whether a host transport is present in this environment.
    fn is_available(&self) -> bool;
}

/// Opaque handle returned by `attach`, used to detach and to address
/// replies. Carries no identity beyond that.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(pub(crate) u64);

impl fmt::Debug for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EndpointId({})", self.0)
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint-{}", self.0)
    }
}

/// A simple in-memory transport for testing.
///
/// Uses unbounded channels to stand in for the two directions of a
/// message port.
pub mod memory {
    use super::*;
    use crate::error::SyncError;
    use tokio::sync::mpsc;

    /// Host → mirror half of a link.
    #[derive(Clone)]
    pub struct MemoryEndpoint {
        tx: mpsc::UnboundedSender<String>,
    }

    impl Endpoint for MemoryEndpoint {
        fn send(&self, message: &str) -> Result<()> {
            self.tx
                .send(message.to_owned())
                .map_err(|_| SyncError::Closed)
        }
    }

    /// Mirror → host half of a link.
    #[derive(Clone)]
    pub struct MemoryMirrorTransport {
        tx: Option<mpsc::UnboundedSender<String>>,
    }

    impl MemoryMirrorTransport {
        /// A transport for a context with no host at all.
        pub fn detached() -> Self {
            Self { tx: None }
        }
    }

    impl MirrorTransport for MemoryMirrorTransport {
        fn send(&self, message: &str) -> Result<()> {
            match &self.tx {
                Some(tx) => tx.send(message.to_owned()).map_err(|_| SyncError::Closed),
                None => Err(SyncError::TransportError("no host transport".into())),
            }
        }

        fn is_available(&self) -> bool {
            self.tx.is_some()
        }
    }

    /// Both halves of one host ↔ mirror link, plus their inboxes.
    pub struct MemoryLink {
        /// Attach this on the host.
        pub endpoint: MemoryEndpoint,
        /// Hand this to the mirror bridge.
        pub mirror_transport: MemoryMirrorTransport,
        /// Envelopes sent by the host, to be fed to the mirror.
        pub to_mirror: mpsc::UnboundedReceiver<String>,
        /// Envelopes sent by the mirror, to be fed to the host.
        pub to_host: mpsc::UnboundedReceiver<String>,
    }

    impl MemoryLink {
        /// Create a connected link.
        pub fn new() -> Self {
            let (host_tx, to_mirror) = mpsc::unbounded_channel();
            let (mirror_tx, to_host) = mpsc::unbounded_channel();
            Self {
                endpoint: MemoryEndpoint { tx: host_tx },
                mirror_transport: MemoryMirrorTransport { tx: Some(mirror_tx) },
                to_mirror,
                to_host,
            }
        }
    }

    impl Default for MemoryLink {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{MemoryLink, MemoryMirrorTransport};
    use super::*;

    #[test]
    fn test_memory_link_both_directions() {
        let mut link = MemoryLink::new();

        link.endpoint.send("to mirror").unwrap();
        link.mirror_transport.send("to host").unwrap();

        assert_eq!(link.to_mirror.try_recv().unwrap(), "to mirror");
        assert_eq!(link.to_host.try_recv().unwrap(), "to host");
        assert!(link.mirror_transport.is_available());
    }

    #[test]
    fn test_memory_endpoint_closed() {
        let link = MemoryLink::new();
        let endpoint = link.endpoint.clone();
        drop(link);

        assert!(endpoint.send("lost").is_err());
    }

    #[test]
    fn test_detached_transport() {
        let transport = MemoryMirrorTransport::detached();
        assert!(!transport.is_available());
        assert!(transport.send("nowhere").is_err());
    }
}
