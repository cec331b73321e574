//! In-process transport over bounded crossbeam channels.
//!
//! A [`LocalHub`] is a routing table from address to channel. Each
//! [`LocalTransport`] owns the receiving end of one bounded channel and
//! caches the senders it has used. A full queue drops the datagram, the
//! same way a saturated UDP socket buffer would.

use super::{Address, Packet, Transport};
use crate::error::TransportError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::trace;

/// Shared routing table for in-process endpoints.
#[derive(Debug, Clone)]
pub struct LocalHub {
    routes: Arc<RwLock<HashMap<Address, Sender<Packet>>>>,
    capacity: usize,
}

impl LocalHub {
    /// Create a hub whose endpoints queue at most `capacity` datagrams.
    pub fn new(capacity: usize) -> Self {
        Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Create an endpoint at `address`.
    ///
    /// # Errors
    ///
    /// [`TransportError::AddressInUse`] if another live endpoint has it.
    pub fn bind(&self, address: impl Into<Address>) -> Result<LocalTransport, TransportError> {
        let address = address.into();
        let (tx, rx) = bounded(self.capacity);
        {
            let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
            if routes.contains_key(&address) {
                return Err(TransportError::AddressInUse(address.to_string()));
            }
            routes.insert(address.clone(), tx);
        }
        trace!(address = %address, "local endpoint bound");
        Ok(LocalTransport {
            address,
            rx,
            hub: self.clone(),
            senders: HashMap::new(),
        })
    }

    /// Number of live endpoints.
    pub fn len(&self) -> usize {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no endpoints are bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn route(&self, to: &Address) -> Option<Sender<Packet>> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(to)
            .cloned()
    }

    fn release(&self, address: &Address) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(address);
    }
}

/// One endpoint on a [`LocalHub`].
#[derive(Debug)]
pub struct LocalTransport {
    address: Address,
    rx: Receiver<Packet>,
    hub: LocalHub,
    senders: HashMap<Address, Sender<Packet>>,
}

impl LocalTransport {
    /// Number of datagrams waiting to be received.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    fn sender(&mut self, to: &Address) -> Option<Sender<Packet>> {
        if let Some(tx) = self.senders.get(to) {
            return Some(tx.clone());
        }
        let tx = self.hub.route(to)?;
        self.senders.insert(to.clone(), tx.clone());
        Some(tx)
    }
}

impl Transport for LocalTransport {
    fn local_address(&self) -> &Address {
        &self.address
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Packet>, TransportError> {
        if timeout.is_zero() {
            return match self.rx.try_recv() {
                Ok(packet) => Ok(Some(packet)),
                Err(TryRecvError::Empty) => Ok(None),
                Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
            };
        }
        match self.rx.recv_timeout(timeout) {
            Ok(packet) => Ok(Some(packet)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    fn send(&mut self, to: &Address, bytes: &[u8]) -> Result<(), TransportError> {
        let packet = Packet {
            from: self.address.clone(),
            bytes: bytes.to_vec(),
        };
        let Some(tx) = self.sender(to) else {
            trace!(to = %to, "no local endpoint, datagram dropped");
            return Ok(());
        };
        match tx.try_send(packet) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!(to = %to, "queue full, datagram dropped"),
            Err(TrySendError::Disconnected(packet)) => {
                // The endpoint was rebound since we cached it.
                self.senders.remove(to);
                if let Some(tx) = self.sender(to) {
                    let _ = tx.try_send(packet);
                }
            }
        }
        Ok(())
    }
}

impl Drop for LocalTransport {
    fn drop(&mut self) {
        self.hub.release(&self.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_receive() {
        let hub = LocalHub::new(8);
        let mut a = hub.bind("a").unwrap();
        let mut b = hub.bind("b").unwrap();

        a.send(&Address::from("b"), b"hello").unwrap();
        let packet = b.recv_timeout(Duration::ZERO).unwrap().unwrap();
        assert_eq!(packet.from, Address::from("a"));
        assert_eq!(packet.bytes, b"hello");
        assert!(b.recv_timeout(Duration::from_millis(1)).unwrap().is_none());
    }

    #[test]
    fn test_full_queue_drops() {
        let hub = LocalHub::new(2);
        let mut a = hub.bind("a").unwrap();
        let b = hub.bind("b").unwrap();
        for _ in 0..5 {
            a.send(&Address::from("b"), b"x").unwrap();
        }
        assert_eq!(b.pending(), 2);
    }

    #[test]
    fn test_unknown_destination_is_loss() {
        let hub = LocalHub::new(2);
        let mut a = hub.bind("a").unwrap();
        assert!(a.send(&Address::from("nowhere"), b"x").is_ok());
    }

    #[test]
    fn test_address_released_on_drop() {
        let hub = LocalHub::new(2);
        let mut a = hub.bind("a").unwrap();
        let b = hub.bind("b").unwrap();
        assert!(matches!(hub.bind("b"), Err(TransportError::AddressInUse(_))));
        a.send(&Address::from("b"), b"1").unwrap();
        drop(b);
        assert_eq!(hub.len(), 1);

        let mut b = hub.bind("b").unwrap();
        a.send(&Address::from("b"), b"2").unwrap();
        assert_eq!(b.recv_timeout(Duration::ZERO).unwrap().unwrap().bytes, b"2");
    }
}
