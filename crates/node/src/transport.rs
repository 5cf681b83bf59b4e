//! Transport collaborator.
//!
//! The consensus core never opens sockets: it hands encoded bytes to a
//! [`Transport`] and receives inbound bytes on a channel. The in-process
//! hub here wires multiple nodes together inside one process for tests and
//! local clusters; a TCP or gossip transport plugs in behind the same
//! trait.

use palisade_types::Address;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unknown peer {0}")]
    UnknownPeer(Address),

    #[error("peer {0} is no longer receiving")]
    PeerGone(Address),
}

/// Outbound side of the network.
pub trait Transport: Send + Sync {
    /// Deliver `bytes` to every other registered peer.
    fn broadcast(&self, bytes: Vec<u8>) -> Result<(), TransportError>;

    /// Deliver `bytes` to one peer.
    fn send(&self, to: &Address, bytes: Vec<u8>) -> Result<(), TransportError>;
}

/// In-process message hub connecting nodes within one process.
#[derive(Default)]
pub struct InProcessHub {
    peers: Mutex<HashMap<Address, mpsc::UnboundedSender<Vec<u8>>>>,
}

impl InProcessHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a node, returning its inbound byte stream.
    pub fn register(&self, address: Address) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address, tx);
        rx
    }

    /// The outbound endpoint for one registered node.
    pub fn endpoint(self: &Arc<Self>, local: Address) -> HubEndpoint {
        HubEndpoint {
            hub: Arc::clone(self),
            local,
        }
    }
}

/// One node's view of the hub.
pub struct HubEndpoint {
    hub: Arc<InProcessHub>,
    local: Address,
}

impl Transport for HubEndpoint {
    fn broadcast(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let peers = self.hub.peers.lock().unwrap_or_else(|e| e.into_inner());
        for (address, tx) in peers.iter() {
            if *address == self.local {
                continue;
            }
            // A dropped receiver is a departed peer, not a local fault.
            let _ = tx.send(bytes.clone());
        }
        Ok(())
    }

    fn send(&self, to: &Address, bytes: Vec<u8>) -> Result<(), TransportError> {
        let peers = self.hub.peers.lock().unwrap_or_else(|e| e.into_inner());
        let tx = peers.get(to).ok_or(TransportError::UnknownPeer(*to))?;
        tx.send(bytes).map_err(|_| TransportError::PeerGone(*to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_types::KeyPair;

    fn addr(seed: u8) -> Address {
        KeyPair::from_seed([seed; 32]).address()
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let hub = InProcessHub::new();
        let a = addr(1);
        let b = addr(2);
        let mut rx_a = hub.register(a);
        let mut rx_b = hub.register(b);

        hub.endpoint(a).broadcast(vec![1, 2, 3]).unwrap();

        assert_eq!(rx_b.try_recv().unwrap(), vec![1, 2, 3]);
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn test_send_reaches_one_peer() {
        let hub = InProcessHub::new();
        let a = addr(1);
        let b = addr(2);
        let c = addr(3);
        let _rx_a = hub.register(a);
        let mut rx_b = hub.register(b);
        let mut rx_c = hub.register(c);

        hub.endpoint(a).send(&b, vec![9]).unwrap();
        assert_eq!(rx_b.try_recv().unwrap(), vec![9]);
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn test_send_to_unknown_peer_errors() {
        let hub = InProcessHub::new();
        let a = addr(1);
        let _rx = hub.register(a);
        let result = hub.endpoint(a).send(&addr(9), vec![0]);
        assert!(matches!(result, Err(TransportError::UnknownPeer(_))));
    }
}
